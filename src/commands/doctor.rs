// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Integrity scan: replays every transaction's balance effects and compares
//! against the stored balances, then checks the smaller invariants the
//! engine maintains. Read-only.

use crate::utils::{parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = scan(conn)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Runs every check and returns one (issue, detail) row per finding.
pub fn scan(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    balance_drift(conn, &mut rows)?;
    invoice_consistency(conn, &mut rows)?;
    default_uniqueness(conn, &mut rows)?;
    card_checks(conn, &mut rows)?;
    Ok(rows)
}

fn balance_drift(conn: &Connection, rows: &mut Vec<Vec<String>>) -> Result<()> {
    // kind + linked account per card, for debit passthrough
    let mut cards: HashMap<i64, (String, Option<i64>)> = HashMap::new();
    let mut stmt = conn.prepare("SELECT id, kind, account_id FROM cards")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        cards.insert(r.get(0)?, (r.get(1)?, r.get(2)?));
    }

    let mut account_delta: HashMap<i64, Decimal> = HashMap::new();
    let mut card_delta: HashMap<i64, Decimal> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT kind, amount, from_account_id, from_card_id, to_account_id, to_card_id
         FROM transactions",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let kind: String = r.get(0)?;
        let amount = parse_decimal(&r.get::<_, String>(1)?)?;
        let from_account: Option<i64> = r.get(2)?;
        let from_card: Option<i64> = r.get(3)?;
        let to_account: Option<i64> = r.get(4)?;
        let to_card: Option<i64> = r.get(5)?;
        match kind.as_str() {
            "income" => {
                if let Some(a) = to_account {
                    *account_delta.entry(a).or_default() += amount;
                } else if let Some(c) = to_card {
                    *card_delta.entry(c).or_default() -= amount;
                }
            }
            "expense" => {
                if let Some(a) = from_account {
                    *account_delta.entry(a).or_default() -= amount;
                } else if let Some(c) = from_card {
                    match cards.get(&c) {
                        Some((k, linked)) if k == "debit" => {
                            if let Some(a) = linked {
                                *account_delta.entry(*a).or_default() -= amount;
                            }
                        }
                        _ => *card_delta.entry(c).or_default() += amount,
                    }
                }
            }
            "transfer" => {
                if let Some(a) = from_account {
                    *account_delta.entry(a).or_default() -= amount;
                }
                if let Some(a) = to_account {
                    *account_delta.entry(a).or_default() += amount;
                }
            }
            "card_payment" => {
                if let Some(a) = from_account {
                    *account_delta.entry(a).or_default() -= amount;
                }
                if let Some(c) = to_card {
                    *card_delta.entry(c).or_default() -= amount;
                }
            }
            _ => {}
        }
    }

    let mut stmt = conn.prepare("SELECT id, name, balance, opening_balance FROM accounts")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let name: String = r.get(1)?;
        let stored = parse_decimal(&r.get::<_, String>(2)?)?;
        let opening = parse_decimal(&r.get::<_, String>(3)?)?;
        let expected = opening + account_delta.get(&id).copied().unwrap_or_default();
        if expected != stored {
            rows.push(vec![
                "balance_drift".into(),
                format!("account '{}': stored {} expected {}", name, stored, expected),
            ]);
        }
    }

    let mut stmt =
        conn.prepare("SELECT id, name, current_balance FROM cards WHERE kind='credit'")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let name: String = r.get(1)?;
        let stored = parse_decimal(&r.get::<_, Option<String>>(2)?.unwrap_or_else(|| "0".into()))?;
        let expected = card_delta.get(&id).copied().unwrap_or_default();
        if expected != stored {
            rows.push(vec![
                "card_balance_drift".into(),
                format!("card '{}': stored {} expected {}", name, stored, expected),
            ]);
        }
    }
    Ok(())
}

fn invoice_consistency(conn: &Connection, rows: &mut Vec<Vec<String>>) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id FROM invoices
         WHERE (status='paid' AND paid_date IS NULL)
            OR (status != 'paid' AND paid_date IS NOT NULL)",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec![
            "paid_date_mismatch".into(),
            format!("invoice {}: paid_date must be set iff status=paid", id),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT id FROM invoices
         WHERE is_recurring=1 AND (frequency IS NULL OR billing_day IS NULL)",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec![
            "recurring_incomplete".into(),
            format!("invoice {}: recurring without frequency/billing_day", id),
        ]);
    }
    Ok(())
}

fn default_uniqueness(conn: &Connection, rows: &mut Vec<Vec<String>>) -> Result<()> {
    for table in ["accounts", "cards"] {
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE is_default=1", table),
            [],
            |r| r.get(0),
        )?;
        if n > 1 {
            rows.push(vec![
                "duplicate_default".into(),
                format!("{} has {} default rows", table, n),
            ]);
        }
    }
    Ok(())
}

fn card_checks(conn: &Connection, rows: &mut Vec<Vec<String>>) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT name FROM cards WHERE kind='debit' AND account_id IS NULL")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let name: String = r.get(0)?;
        rows.push(vec![
            "debit_unlinked".into(),
            format!("debit card '{}' has no linked account", name),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT name, current_balance, credit_limit FROM cards
         WHERE kind='credit' AND credit_limit IS NOT NULL",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let name: String = r.get(0)?;
        let owed = parse_decimal(&r.get::<_, Option<String>>(1)?.unwrap_or_else(|| "0".into()))?;
        let limit = parse_decimal(&r.get::<_, String>(2)?)?;
        if owed > limit {
            rows.push(vec![
                "over_limit".into(),
                format!("card '{}' owes {} over limit {}", name, owed, limit),
            ]);
        }
    }
    Ok(())
}
