// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use centime::{cli, commands::exporter};
use rusqlite::{Connection, params};
use serde_json::json;
use tempfile::tempdir;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    centime::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance)
         VALUES ('Checking','CHF','500','500')",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO categories(name) VALUES ('Groceries')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO transactions(kind, date, amount, currency, from_account_id,
             category_id, merchant, note)
         VALUES ('expense','2024-01-02','12.34','CHF',1,1,'Corner Shop','Weekly run')",
        [],
    )
    .unwrap();
    conn
}

fn run_export(conn: &Connection, format: &str, out: &str) -> anyhow::Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "centime",
        "export",
        "transactions",
        "--format",
        format,
        "--out",
        out,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(conn, export_m)
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn export_transactions_writes_pretty_json() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(&conn, "json", &out_str).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        parsed,
        json!([
            {
                "date": "2024-01-02",
                "type": "expense",
                "amount": "12.34",
                "currency": "CHF",
                "source": "Checking",
                "destination": "",
                "category": "Groceries",
                "merchant": "Corner Shop",
                "note": "Weekly run"
            }
        ])
    );
}

#[test]
fn export_transactions_writes_csv_with_header() {
    let conn = base_conn();
    conn.execute(
        "INSERT INTO transactions(kind, date, amount, currency, to_account_id)
         VALUES ('income','2024-01-05','1000','CHF',1)",
        params![],
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(&conn, "csv", &out_str).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,type,amount,currency,source,destination,category,merchant,note"
    );
    assert_eq!(
        lines.next().unwrap(),
        "2024-01-02,expense,12.34,CHF,Checking,,Groceries,Corner Shop,Weekly run"
    );
    assert_eq!(lines.next().unwrap(), "2024-01-05,income,1000,CHF,,Checking,,,");
    assert!(lines.next().is_none());
}

#[test]
fn export_transactions_rejects_unknown_format() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    let out_str = out_path.to_string_lossy().to_string();

    assert!(run_export(&conn, "xml", &out_str).is_err());
    assert!(!out_path.exists());
}
