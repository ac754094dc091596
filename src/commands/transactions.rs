// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger;
use crate::models::{TransactionInput, TransactionKind};
use crate::utils::{
    id_for_account, id_for_card, id_for_category, maybe_print_json, parse_amount, parse_date,
    pretty_table,
};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = input_from_args(conn, sub)?;
            let id = ledger::create_transaction(conn, &input)?;
            println!(
                "Recorded {} {} {} on {} (tx {})",
                input.kind.as_str(),
                input.amount,
                input.currency,
                input.date,
                id
            );
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let input = input_from_args(conn, sub)?;
            ledger::update_transaction(conn, id, &input)?;
            println!("Updated tx {}", id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            ledger::delete_transaction(conn, id)?;
            println!("Removed tx {} and restored balances", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn input_from_args(conn: &Connection, sub: &clap::ArgMatches) -> Result<TransactionInput> {
    let kind = TransactionKind::parse(sub.get_one::<String>("type").unwrap().trim())?;
    let date = parse_date(sub.get_one::<String>("date").unwrap().trim())?;
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;

    let lookup = |key: &str, f: &dyn Fn(&Connection, &str) -> Result<i64>| -> Result<Option<i64>> {
        sub.get_one::<String>(key).map(|n| f(conn, n.trim())).transpose()
    };
    let from_account_id = lookup("from-account", &id_for_account)?;
    let from_card_id = lookup("from-card", &id_for_card)?;
    let to_account_id = lookup("to-account", &id_for_account)?;
    let to_card_id = lookup("to-card", &id_for_card)?;
    let category_id = lookup("category", &id_for_category)?;

    let currency = match sub.get_one::<String>("currency") {
        Some(c) => c.trim().to_uppercase(),
        None => derive_currency(conn, kind, from_account_id, from_card_id, to_account_id, to_card_id)?,
    };

    Ok(TransactionInput {
        kind,
        date,
        amount,
        currency,
        from_account_id,
        from_card_id,
        to_account_id,
        to_card_id,
        category_id,
        merchant: sub.get_one::<String>("merchant").map(|s| s.trim().to_string()),
        note: sub.get_one::<String>("note").map(|s| s.to_string()),
    })
}

/// Without an explicit --currency, the transaction inherits the currency
/// of the instrument money moves through.
fn derive_currency(
    conn: &Connection,
    kind: TransactionKind,
    from_account: Option<i64>,
    from_card: Option<i64>,
    to_account: Option<i64>,
    to_card: Option<i64>,
) -> Result<String> {
    let (account_id, card_id) = match kind {
        TransactionKind::Income => (to_account, to_card),
        _ => (from_account, from_card),
    };
    if let Some(id) = account_id {
        let ccy: String = conn
            .query_row(
                "SELECT currency FROM accounts WHERE id=?1",
                rusqlite::params![id],
                |r| r.get(0),
            )
            .with_context(|| format!("Account {} not found", id))?;
        return Ok(ccy);
    }
    if let Some(id) = card_id {
        let ccy: String = conn
            .query_row(
                "SELECT currency FROM cards WHERE id=?1",
                rusqlite::params![id],
                |r| r.get(0),
            )
            .with_context(|| format!("Card {} not found", id))?;
        return Ok(ccy);
    }
    Err(anyhow!(
        "--currency is required when no account or card is referenced"
    ))
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub from: String,
    pub to: String,
    pub category: String,
    pub merchant: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.kind, t.amount, t.currency,
                COALESCE(fa.name, fc.name, ''), COALESCE(ta.name, tc.name, ''),
                c.name, t.merchant
         FROM transactions t
         LEFT JOIN accounts fa ON t.from_account_id=fa.id
         LEFT JOIN cards fc ON t.from_card_id=fc.id
         LEFT JOIN accounts ta ON t.to_account_id=ta.id
         LEFT JOIN cards tc ON t.to_card_id=tc.id
         LEFT JOIN categories c ON t.category_id=c.id WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND (fa.name=? OR ta.name=?)");
        params_vec.push(acct.into());
        params_vec.push(acct.into());
    }
    if let Some(kind) = sub.get_one::<String>("type") {
        sql.push_str(" AND t.kind=?");
        params_vec.push(kind.into());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            kind: r.get(2)?,
            amount: r.get(3)?,
            currency: r.get(4)?,
            from: r.get(5)?,
            to: r.get(6)?,
            category: r.get::<_, Option<String>>(7)?.unwrap_or_default(),
            merchant: r.get::<_, Option<String>>(8)?.unwrap_or_default(),
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.currency.clone(),
                    r.from.clone(),
                    r.to.clone(),
                    r.category.clone(),
                    r.merchant.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Type", "Amount", "CCY", "From", "To", "Category", "Merchant"],
                rows,
            )
        );
    }
    Ok(())
}
