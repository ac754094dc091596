// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use centime::errors::LedgerError;
use centime::ledger;
use centime::models::{TransactionInput, TransactionKind};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    centime::db::init_schema(&mut conn).unwrap();
    conn
}

fn add_account(conn: &Connection, name: &str, ccy: &str, balance: &str) -> i64 {
    conn.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance) VALUES (?1,?2,?3,?3)",
        params![name, ccy, balance],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn add_credit_card(conn: &Connection, name: &str, ccy: &str, limit: &str, owed: &str) -> i64 {
    conn.execute(
        "INSERT INTO cards(name, kind, currency, credit_limit, current_balance)
         VALUES (?1,'credit',?2,?3,?4)",
        params![name, ccy, limit, owed],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn add_debit_card(conn: &Connection, name: &str, ccy: &str, account_id: i64) -> i64 {
    conn.execute(
        "INSERT INTO cards(name, kind, currency, account_id) VALUES (?1,'debit',?2,?3)",
        params![name, ccy, account_id],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn balance(conn: &Connection, id: i64) -> Decimal {
    let s: String = conn
        .query_row("SELECT balance FROM accounts WHERE id=?1", params![id], |r| {
            r.get(0)
        })
        .unwrap();
    s.parse().unwrap()
}

fn owed(conn: &Connection, id: i64) -> Decimal {
    let s: String = conn
        .query_row(
            "SELECT current_balance FROM cards WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    s.parse().unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn input(kind: TransactionKind, amount: &str, ccy: &str) -> TransactionInput {
    TransactionInput {
        kind,
        date: date("2024-03-15"),
        amount: dec(amount),
        currency: ccy.to_string(),
        from_account_id: None,
        from_card_id: None,
        to_account_id: None,
        to_card_id: None,
        category_id: None,
        merchant: None,
        note: None,
    }
}

#[test]
fn expense_reduces_balance_and_delete_restores() {
    let mut conn = setup();
    let a = add_account(&conn, "Main", "CHF", "500");
    conn.execute("INSERT INTO categories(name) VALUES('Groceries')", [])
        .unwrap();
    let cat: i64 = conn
        .query_row("SELECT id FROM categories WHERE name='Groceries'", [], |r| {
            r.get(0)
        })
        .unwrap();

    let mut t = input(TransactionKind::Expense, "50", "CHF");
    t.from_account_id = Some(a);
    t.category_id = Some(cat);
    let id = ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(balance(&conn, a), dec("450"));

    ledger::delete_transaction(&mut conn, id).unwrap();
    assert_eq!(balance(&conn, a), dec("500"));
}

#[test]
fn transfer_conserves_total_balance() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "300");
    let b = add_account(&conn, "B", "CHF", "120.50");

    let mut t = input(TransactionKind::Transfer, "75.25", "CHF");
    t.from_account_id = Some(a);
    t.to_account_id = Some(b);
    ledger::create_transaction(&mut conn, &t).unwrap();

    assert_eq!(balance(&conn, a), dec("224.75"));
    assert_eq!(balance(&conn, b), dec("195.75"));
    assert_eq!(balance(&conn, a) + balance(&conn, b), dec("420.50"));
}

#[test]
fn transfer_to_same_account_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "300");
    let mut t = input(TransactionKind::Transfer, "10", "CHF");
    t.from_account_id = Some(a);
    t.to_account_id = Some(a);
    let err = ledger::create_transaction(&mut conn, &t).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(balance(&conn, a), dec("300"));
}

#[test]
fn cross_currency_transfer_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "300");
    let b = add_account(&conn, "B", "EUR", "0");
    let mut t = input(TransactionKind::Transfer, "10", "CHF");
    t.from_account_id = Some(a);
    t.to_account_id = Some(b);
    let err = ledger::create_transaction(&mut conn, &t).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(balance(&conn, a), dec("300"));
    assert_eq!(balance(&conn, b), dec("0"));
}

#[test]
fn transfer_currency_comparison_ignores_case() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "300");
    let b = add_account(&conn, "B", "chf", "0");
    let mut t = input(TransactionKind::Transfer, "10", "CHF");
    t.from_account_id = Some(a);
    t.to_account_id = Some(b);
    ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(balance(&conn, a), dec("290"));
    assert_eq!(balance(&conn, b), dec("10"));
}

#[test]
fn non_positive_amount_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "300");
    let mut t = input(TransactionKind::Expense, "0", "CHF");
    t.amount = Decimal::ZERO;
    t.from_account_id = Some(a);
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
}

#[test]
fn missing_references_rejected() {
    let mut conn = setup();
    // Expense with no source at all
    let t = input(TransactionKind::Expense, "10", "CHF");
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
    // Income with both destinations
    let a = add_account(&conn, "A", "CHF", "0");
    let c = add_credit_card(&conn, "Visa", "CHF", "1000", "0");
    let mut t = input(TransactionKind::Income, "10", "CHF");
    t.to_account_id = Some(a);
    t.to_card_id = Some(c);
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
}

#[test]
fn income_to_account_and_card() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "100");
    let c = add_credit_card(&conn, "Visa", "CHF", "1000", "200");

    let mut t = input(TransactionKind::Income, "40", "CHF");
    t.to_account_id = Some(a);
    ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(balance(&conn, a), dec("140"));

    // Cashback onto the credit card reduces what's owed.
    let mut t = input(TransactionKind::Income, "25", "CHF");
    t.to_card_id = Some(c);
    ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(owed(&conn, c), dec("175"));
}

#[test]
fn income_to_debit_card_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "100");
    let d = add_debit_card(&conn, "Maestro", "CHF", a);
    let mut t = input(TransactionKind::Income, "40", "CHF");
    t.to_card_id = Some(d);
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
}

#[test]
fn credit_card_expense_increases_owed() {
    let mut conn = setup();
    let c = add_credit_card(&conn, "Visa", "CHF", "1000", "200");
    let mut t = input(TransactionKind::Expense, "60", "CHF");
    t.from_card_id = Some(c);
    ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(owed(&conn, c), dec("260"));
}

#[test]
fn debit_card_expense_passes_through_linked_account() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let d = add_debit_card(&conn, "Maestro", "CHF", a);
    let mut t = input(TransactionKind::Expense, "80", "CHF");
    t.from_card_id = Some(d);
    ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(balance(&conn, a), dec("420"));
}

#[test]
fn card_payment_scenario() {
    // Pay 100 from an account to a card owing 250 with a 1000 limit:
    // account -100, owed 150, available 850.
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let c = add_credit_card(&conn, "Visa", "CHF", "1000", "250");

    let mut t = input(TransactionKind::CardPayment, "100", "CHF");
    t.from_account_id = Some(a);
    t.to_card_id = Some(c);
    ledger::create_transaction(&mut conn, &t).unwrap();

    assert_eq!(balance(&conn, a), dec("400"));
    assert_eq!(owed(&conn, c), dec("150"));
    let limit: String = conn
        .query_row("SELECT credit_limit FROM cards WHERE id=?1", params![c], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(dec(&limit) - owed(&conn, c), dec("850"));
}

#[test]
fn card_payment_to_debit_card_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let d = add_debit_card(&conn, "Maestro", "CHF", a);
    let mut t = input(TransactionKind::CardPayment, "100", "CHF");
    t.from_account_id = Some(a);
    t.to_card_id = Some(d);
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
}

#[test]
fn currency_mismatch_rejected() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let mut t = input(TransactionKind::Expense, "10", "EUR");
    t.from_account_id = Some(a);
    assert!(matches!(
        ledger::create_transaction(&mut conn, &t).unwrap_err(),
        LedgerError::Validation(_)
    ));
    assert_eq!(balance(&conn, a), dec("500"));
}

#[test]
fn reversal_restores_every_kind() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let b = add_account(&conn, "B", "CHF", "200");
    let c = add_credit_card(&conn, "Visa", "CHF", "1000", "250");

    let cases = {
        let mut income = input(TransactionKind::Income, "30", "CHF");
        income.to_account_id = Some(a);
        let mut expense = input(TransactionKind::Expense, "45", "CHF");
        expense.from_card_id = Some(c);
        let mut transfer = input(TransactionKind::Transfer, "70", "CHF");
        transfer.from_account_id = Some(a);
        transfer.to_account_id = Some(b);
        let mut payment = input(TransactionKind::CardPayment, "100", "CHF");
        payment.from_account_id = Some(b);
        payment.to_card_id = Some(c);
        vec![income, expense, transfer, payment]
    };

    for t in cases {
        let before = (balance(&conn, a), balance(&conn, b), owed(&conn, c));
        let id = ledger::create_transaction(&mut conn, &t).unwrap();
        ledger::delete_transaction(&mut conn, id).unwrap();
        assert_eq!(
            (balance(&conn, a), balance(&conn, b), owed(&conn, c)),
            before,
            "reversal drift for {:?}",
            t.kind
        );
    }
}

#[test]
fn edit_applies_exact_delta() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let mut t = input(TransactionKind::Expense, "50", "CHF");
    t.from_account_id = Some(a);
    let id = ledger::create_transaction(&mut conn, &t).unwrap();
    assert_eq!(balance(&conn, a), dec("450"));

    let mut edited = t.clone();
    edited.amount = dec("80");
    ledger::update_transaction(&mut conn, id, &edited).unwrap();
    assert_eq!(balance(&conn, a), dec("420"));

    // Editing across kinds reverses the old shape entirely.
    let b = add_account(&conn, "B", "CHF", "0");
    let mut as_transfer = input(TransactionKind::Transfer, "80", "CHF");
    as_transfer.from_account_id = Some(a);
    as_transfer.to_account_id = Some(b);
    ledger::update_transaction(&mut conn, id, &as_transfer).unwrap();
    assert_eq!(balance(&conn, a), dec("420"));
    assert_eq!(balance(&conn, b), dec("80"));
}

#[test]
fn edit_failure_leaves_balances_untouched() {
    let mut conn = setup();
    let a = add_account(&conn, "A", "CHF", "500");
    let mut t = input(TransactionKind::Expense, "50", "CHF");
    t.from_account_id = Some(a);
    let id = ledger::create_transaction(&mut conn, &t).unwrap();

    // New shape is invalid: transfer with a single account.
    let mut bad = input(TransactionKind::Transfer, "80", "CHF");
    bad.from_account_id = Some(a);
    bad.to_account_id = Some(a);
    assert!(ledger::update_transaction(&mut conn, id, &bad).is_err());
    assert_eq!(balance(&conn, a), dec("450"));
}
