// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("set-default", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            set_default(conn, name)?;
            println!("Default account set to '{}'", name);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("DELETE FROM accounts WHERE name=?1", params![name])?;
            println!("Removed account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let balance = match sub.get_one::<String>("balance") {
        Some(s) => parse_decimal(s.trim())?.round_dp(2),
        None => rust_decimal::Decimal::ZERO,
    };
    let make_default = sub.get_flag("default");

    let tx = conn.transaction()?;
    if make_default {
        tx.execute("UPDATE accounts SET is_default=0 WHERE is_default=1", [])?;
    }
    tx.execute(
        "INSERT INTO accounts(name, currency, balance, opening_balance, is_default)
         VALUES (?1, ?2, ?3, ?3, ?4)",
        params![name, ccy, balance.to_string(), make_default],
    )?;
    tx.commit()?;
    println!("Added account '{}' ({}, opening {})", name, ccy, balance);
    Ok(())
}

/// Flips the default flag atomically: the previous default is unset in the
/// same transaction, so at most one default ever exists.
pub fn set_default(conn: &mut Connection, name: &str) -> Result<()> {
    let tx = conn.transaction()?;
    let id = crate::utils::id_for_account(&tx, name)?;
    tx.execute("UPDATE accounts SET is_default=0 WHERE is_default=1", [])?;
    tx.execute("UPDATE accounts SET is_default=1 WHERE id=?1", params![id])?;
    tx.commit()?;
    Ok(())
}

#[derive(Serialize)]
struct AccountRow {
    name: String,
    currency: String,
    balance: String,
    is_default: bool,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt =
        conn.prepare("SELECT name, currency, balance, is_default FROM accounts ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(AccountRow {
            name: r.get(0)?,
            currency: r.get(1)?,
            balance: r.get(2)?,
            is_default: r.get(3)?,
        })
    })?;
    let data: Vec<AccountRow> = rows.collect::<std::result::Result<_, _>>()?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.currency.clone(),
                    a.balance.clone(),
                    if a.is_default { "*".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Name", "Currency", "Balance", "Default"], rows)
        );
    }
    Ok(())
}
