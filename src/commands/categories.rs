// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_category, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("INSERT INTO categories(name) VALUES (?1)", params![name])?;
            println!("Added category '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT c.name,
                        (SELECT COUNT(*) FROM transactions t WHERE t.category_id=c.id)
                      + (SELECT COUNT(*) FROM subscriptions s WHERE s.category_id=c.id)
                 FROM categories c ORDER BY c.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (name, used) = row?;
                data.push(vec![name, used.to_string()]);
            }
            println!("{}", pretty_table(&["Category", "Used"], data));
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            remove(conn, name.trim())?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

/// Refuses to remove a category that transactions or subscriptions still
/// point at; dropping it would silently uncategorize history.
pub fn remove(conn: &Connection, name: &str) -> Result<()> {
    let id = id_for_category(conn, name)?;
    let used: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM transactions WHERE category_id=?1)
              + (SELECT COUNT(*) FROM subscriptions WHERE category_id=?1)",
        params![id],
        |r| r.get(0),
    )?;
    if used > 0 {
        return Err(anyhow!(
            "Category '{}' is still referenced by {} transaction(s)/subscription(s)",
            name,
            used
        ));
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    Ok(())
}
