// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use centime::commands::categories;
use rusqlite::{Connection, params};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    centime::db::init_schema(&mut conn).unwrap();
    conn
}

#[test]
fn referenced_category_cannot_be_removed() {
    let conn = setup();
    conn.execute("INSERT INTO categories(name) VALUES ('Groceries')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance)
         VALUES ('Main','CHF','500','500')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(kind, date, amount, currency, from_account_id, category_id)
         VALUES ('expense','2024-01-10','50','CHF',1,1)",
        [],
    )
    .unwrap();

    let err = categories::remove(&conn, "Groceries").unwrap_err();
    assert!(err.to_string().contains("still referenced"));
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 1);
}

#[test]
fn category_referenced_by_subscription_cannot_be_removed() {
    let conn = setup();
    conn.execute("INSERT INTO categories(name) VALUES ('Streaming')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO subscriptions(name, amount, currency, billing_cycle, billing_day,
             start_date, next_billing_date, category_id)
         VALUES ('Netflix','18.90','CHF','monthly',15,'2024-01-15','2024-01-15',1)",
        [],
    )
    .unwrap();

    assert!(categories::remove(&conn, "Streaming").is_err());
}

#[test]
fn unreferenced_category_is_removed() {
    let conn = setup();
    conn.execute("INSERT INTO categories(name) VALUES ('Unused')", [])
        .unwrap();
    categories::remove(&conn, "Unused").unwrap();
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE name=?1",
            params!["Unused"],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(n, 0);
}
