// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.date, t.kind, t.amount, t.currency,
                COALESCE(fa.name, fc.name, '') as source,
                COALESCE(ta.name, tc.name, '') as destination,
                c.name as category, t.merchant, t.note
         FROM transactions t
         LEFT JOIN accounts fa ON t.from_account_id=fa.id
         LEFT JOIN cards fc ON t.from_card_id=fc.id
         LEFT JOIN accounts ta ON t.to_account_id=ta.id
         LEFT JOIN cards tc ON t.to_card_id=tc.id
         LEFT JOIN categories c ON t.category_id=c.id
         ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, Option<String>>(7)?,
            r.get::<_, Option<String>>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date", "type", "amount", "currency", "source", "destination", "category",
                "merchant", "note",
            ])?;
            for row in rows {
                let (d, k, amt, ccy, src, dst, cat, merchant, note) = row?;
                wtr.write_record([
                    d,
                    k,
                    amt,
                    ccy,
                    src,
                    dst,
                    cat.unwrap_or_default(),
                    merchant.unwrap_or_default(),
                    note.unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (d, k, amt, ccy, src, dst, cat, merchant, note) = row?;
                items.push(json!({
                    "date": d, "type": k, "amount": amt, "currency": ccy,
                    "source": src, "destination": dst, "category": cat,
                    "merchant": merchant, "note": note
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        other => anyhow::bail!("unknown format '{}' (use csv|json)", other),
    }
    println!("Exported transactions to {}", out);
    Ok(())
}
