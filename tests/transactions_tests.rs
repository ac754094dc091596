// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use centime::{cli, commands::transactions};
use rusqlite::{Connection, params};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    centime::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance)
         VALUES ('Main','CHF','500','500')",
        [],
    )
    .unwrap();
    for i in 1..=3 {
        conn.execute(
            "INSERT INTO transactions(kind, date, amount, currency, from_account_id)
             VALUES ('expense',?1,'10','CHF',1)",
            params![format!("2024-01-0{}", i)],
        )
        .unwrap();
    }
    conn
}

fn list_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["centime", "tx", "list"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    let Some(("list", list_m)) = tx_m.subcommand() else {
        panic!("no list subcommand");
    };
    list_m.clone()
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let rows = transactions::query_rows(&conn, &list_matches(&["--limit", "2"])).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2024-01-03");
}

#[test]
fn list_filters_by_month_and_type() {
    let conn = setup();
    conn.execute(
        "INSERT INTO transactions(kind, date, amount, currency, to_account_id)
         VALUES ('income','2024-02-01','1000','CHF',1)",
        [],
    )
    .unwrap();

    let rows = transactions::query_rows(&conn, &list_matches(&["--month", "2024-01"])).unwrap();
    assert_eq!(rows.len(), 3);

    let rows = transactions::query_rows(&conn, &list_matches(&["--type", "income"])).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to, "Main");
}

#[test]
fn list_filters_by_account_on_either_side() {
    let conn = setup();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance)
         VALUES ('Savings','CHF','0','0')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(kind, date, amount, currency, from_account_id, to_account_id)
         VALUES ('transfer','2024-01-10','50','CHF',1,2)",
        [],
    )
    .unwrap();

    let rows = transactions::query_rows(&conn, &list_matches(&["--account", "Savings"])).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "transfer");
    assert_eq!(rows[0].from, "Main");
    assert_eq!(rows[0].to, "Savings");
}
