// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::CardKind;
use crate::utils::{id_for_account, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("set-default", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            set_default(conn, name)?;
            println!("Default card set to '{}'", name);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("DELETE FROM cards WHERE name=?1", params![name])?;
            println!("Removed card '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let kind = CardKind::parse(sub.get_one::<String>("kind").unwrap().trim())?;
    let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let account = sub.get_one::<String>("account").map(|s| s.trim().to_string());
    let limit = sub
        .get_one::<String>("limit")
        .map(|s| parse_decimal(s.trim()))
        .transpose()?
        .map(|d| d.round_dp(2));
    let make_default = sub.get_flag("default");

    if kind == CardKind::Debit && account.is_none() {
        return Err(anyhow!("Debit card '{}' requires --account", name));
    }
    if kind == CardKind::Debit && limit.is_some() {
        return Err(anyhow!("Debit cards have no credit limit"));
    }

    let tx = conn.transaction()?;
    let account_id = match account {
        Some(ref a) => Some(id_for_account(&tx, a)?),
        None => None,
    };
    // Credit cards start with nothing owed; debit cards carry no balance.
    let (limit_s, owed_s) = match kind {
        CardKind::Credit => (
            limit.map(|d| d.to_string()),
            Some(Decimal::ZERO.to_string()),
        ),
        CardKind::Debit => (None, None),
    };
    if make_default {
        tx.execute("UPDATE cards SET is_default=0 WHERE is_default=1", [])?;
    }
    tx.execute(
        "INSERT INTO cards(name, kind, currency, account_id, credit_limit, current_balance, is_default)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![name, kind.as_str(), ccy, account_id, limit_s, owed_s, make_default],
    )?;
    tx.commit()?;
    println!("Added {} card '{}' ({})", kind.as_str(), name, ccy);
    Ok(())
}

pub fn set_default(conn: &mut Connection, name: &str) -> Result<()> {
    let tx = conn.transaction()?;
    let id = crate::utils::id_for_card(&tx, name)?;
    tx.execute("UPDATE cards SET is_default=0 WHERE is_default=1", [])?;
    tx.execute("UPDATE cards SET is_default=1 WHERE id=?1", params![id])?;
    tx.commit()?;
    Ok(())
}

#[derive(Serialize)]
struct CardRow {
    name: String,
    kind: String,
    currency: String,
    account: Option<String>,
    credit_limit: Option<String>,
    current_balance: Option<String>,
    available_credit: Option<String>,
    is_default: bool,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt = conn.prepare(
        "SELECT c.name, c.kind, c.currency, a.name, c.credit_limit, c.current_balance, c.is_default
         FROM cards c LEFT JOIN accounts a ON c.account_id=a.id ORDER BY c.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<String>>(5)?,
            r.get::<_, bool>(6)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, kind, ccy, account, limit, owed, is_default) = row?;
        let available = match (limit.as_deref(), owed.as_deref()) {
            (Some(l), Some(o)) => {
                let l: Decimal = parse_decimal(l)?;
                let o: Decimal = parse_decimal(o)?;
                Some((l - o).max(Decimal::ZERO).to_string())
            }
            _ => None,
        };
        data.push(CardRow {
            name,
            kind,
            currency: ccy,
            account,
            credit_limit: limit,
            current_balance: owed,
            available_credit: available,
            is_default,
        });
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.kind.clone(),
                    c.currency.clone(),
                    c.account.clone().unwrap_or_default(),
                    c.credit_limit.clone().unwrap_or_default(),
                    c.current_balance.clone().unwrap_or_default(),
                    c.available_credit.clone().unwrap_or_default(),
                    if c.is_default { "*".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Kind", "CCY", "Account", "Limit", "Owed", "Available", "Default"],
                rows
            )
        );
    }
    Ok(())
}
