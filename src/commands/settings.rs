// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{get_reminder_days, pretty_table, set_reminder_days};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let days = get_reminder_days(conn)?;
            println!(
                "{}",
                pretty_table(
                    &["Setting", "Value"],
                    vec![vec!["reminder_days".into(), days.to_string()]]
                )
            );
        }
        Some(("set", sub)) => {
            if let Some(days) = sub.get_one::<i64>("reminder-days") {
                set_reminder_days(conn, *days)?;
                println!("reminder_days = {}", days);
            }
        }
        _ => {}
    }
    Ok(())
}
