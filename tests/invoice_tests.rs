// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use centime::errors::LedgerError;
use centime::invoices;
use centime::models::{InvoiceStatus, PaymentSource};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    centime::db::init_schema(&mut conn).unwrap();
    conn
}

fn add_account(conn: &Connection, name: &str, balance: &str) -> i64 {
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance) VALUES (?1,'CHF',?2,?2)",
        params![name, balance],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn add_invoice(conn: &Connection, creditor: &str, amount: &str, due: Option<&str>) -> i64 {
    conn.execute(
        "INSERT INTO invoices(creditor, amount, currency, issue_date, due_date)
         VALUES (?1,?2,'CHF','2024-01-01',?3)",
        params![creditor, amount, due],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn add_recurring_invoice(
    conn: &Connection,
    creditor: &str,
    amount: &str,
    due: &str,
    frequency: &str,
    billing_day: u32,
) -> i64 {
    conn.execute(
        "INSERT INTO invoices(creditor, amount, currency, issue_date, due_date,
             is_recurring, frequency, billing_day, next_due_date)
         VALUES (?1,?2,'CHF','2024-01-01',?3,1,?4,?5,?3)",
        params![creditor, amount, due, frequency, billing_day],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn balance(conn: &Connection, id: i64) -> Decimal {
    let s: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=?1", params![id], |r| {
            r.get(0)
        })
        .unwrap();
    s.parse().unwrap()
}

#[test]
fn refresh_status_derives_overdue() {
    let mut conn = setup();
    let id = add_invoice(&conn, "Swisscom", "80", Some("2024-01-15"));
    let mut invoice = invoices::load_invoice(&conn, id).unwrap();

    assert!(!invoices::refresh_status(&mut invoice, date("2024-01-15")));
    assert_eq!(invoice.status, InvoiceStatus::Pending);

    assert!(invoices::refresh_status(&mut invoice, date("2024-01-16")));
    assert_eq!(invoice.status, InvoiceStatus::Overdue);

    // Already overdue: no further change.
    assert!(!invoices::refresh_status(&mut invoice, date("2024-02-01")));

    // Persisting pass flips the row too.
    let n = invoices::refresh_all(&mut conn, date("2024-01-16")).unwrap();
    assert_eq!(n, 1);
    let status: String = conn
        .query_row("SELECT status FROM invoices WHERE id=?1", params![id], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(status, "overdue");
}

#[test]
fn pay_creates_expense_and_is_terminal() {
    let mut conn = setup();
    let a = add_account(&conn, "Main", "500");
    let id = add_invoice(&conn, "Swisscom", "80", Some("2024-02-01"));

    let tx = invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-01-20"))
        .unwrap();
    assert!(tx.is_some());
    assert_eq!(balance(&conn, a), "420".parse::<Decimal>().unwrap());

    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.paid_date, Some(date("2024-01-20")));
    assert_eq!(invoice.times_paid, 1);

    // Terminal for a non-recurring invoice.
    let err = invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-01-21"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert!(matches!(
        invoices::cancel_invoice(&mut conn, id).unwrap_err(),
        LedgerError::InvalidState(_)
    ));
}

#[test]
fn pay_without_transaction_touches_no_balance() {
    let mut conn = setup();
    let a = add_account(&conn, "Main", "500");
    let id = add_invoice(&conn, "Swisscom", "80", None);

    let tx = invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), false, date("2024-01-20"))
        .unwrap();
    assert!(tx.is_none());
    assert_eq!(balance(&conn, a), "500".parse::<Decimal>().unwrap());
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[test]
fn pay_overdue_invoice_is_allowed() {
    let mut conn = setup();
    let a = add_account(&conn, "Main", "500");
    let id = add_invoice(&conn, "Swisscom", "80", Some("2024-01-15"));
    invoices::refresh_all(&mut conn, date("2024-02-01")).unwrap();

    invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-02-01"))
        .unwrap();
    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[test]
fn cancel_is_terminal_and_has_no_balance_effect() {
    let mut conn = setup();
    let a = add_account(&conn, "Main", "500");
    let id = add_invoice(&conn, "Swisscom", "80", None);

    invoices::cancel_invoice(&mut conn, id).unwrap();
    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Cancelled);
    assert_eq!(balance(&conn, a), "500".parse::<Decimal>().unwrap());

    assert!(matches!(
        invoices::cancel_invoice(&mut conn, id).unwrap_err(),
        LedgerError::InvalidState(_)
    ));
    assert!(matches!(
        invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-01-21"))
            .unwrap_err(),
        LedgerError::InvalidState(_)
    ));
}

#[test]
fn recurring_invoice_advances_same_row() {
    // Monthly invoice due 2024-01-15, paid 2024-01-20 with a transaction:
    // one expense, times_paid=1, new cycle due 2024-02-15.
    let mut conn = setup();
    let a = add_account(&conn, "Main", "500");
    let id = add_recurring_invoice(&conn, "Netflix", "18.90", "2024-01-15", "monthly", 15);

    invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-01-20"))
        .unwrap();

    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE kind='expense' AND amount='18.90'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(n, 1);

    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.times_paid, 1);
    assert_eq!(invoice.due_date, Some(date("2024-02-15")));
    assert_eq!(invoice.next_due_date, Some(date("2024-02-15")));
    assert_eq!(invoice.paid_date, None);

    // The same row keeps cycling.
    invoices::pay_invoice(&mut conn, id, PaymentSource::Account(a), true, date("2024-02-16"))
        .unwrap();
    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.times_paid, 2);
    assert_eq!(invoice.due_date, Some(date("2024-03-15")));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM invoices", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn pay_with_credit_card_accrues_owed_balance() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO cards(name, kind, currency, credit_limit, current_balance)
         VALUES ('Visa','credit','CHF','1000','0')",
        [],
    )
    .unwrap();
    let card: i64 = conn.last_insert_rowid();
    let id = add_invoice(&conn, "Galaxus", "120.50", None);

    invoices::pay_invoice(&mut conn, id, PaymentSource::Card(card), true, date("2024-01-20"))
        .unwrap();
    let owed: String = conn
        .query_row(
            "SELECT current_balance FROM cards WHERE id=?1",
            params![card],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(owed.parse::<Decimal>().unwrap(), "120.50".parse().unwrap());
}

#[test]
fn failed_payment_rolls_everything_back() {
    let mut conn = setup();
    let id = add_invoice(&conn, "Swisscom", "80", None);
    // Account 999 does not exist; the expense fails, so the invoice must
    // stay pending.
    let err = invoices::pay_invoice(
        &mut conn,
        id,
        PaymentSource::Account(999),
        true,
        date("2024-01-20"),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let invoice = invoices::load_invoice(&conn, id).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.times_paid, 0);
}
