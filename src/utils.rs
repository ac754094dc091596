// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Money entering the system: positive, normalized to two fractional digits.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let d = parse_decimal(s.trim())?;
    if d <= Decimal::ZERO {
        return Err(anyhow!("Amount must be positive, got '{}'", s));
    }
    Ok(d.round_dp(2))
}

pub fn parse_billing_day(s: &str) -> Result<u32> {
    let day: u32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid billing day '{}'", s))?;
    if !(1..=31).contains(&day) {
        return Err(anyhow!("Billing day must be 1-31, got {}", day));
    }
    Ok(day)
}

/// Weekly schedules bill on a weekday: 0=Sunday .. 6=Saturday.
pub fn parse_weekday(s: &str) -> Result<u32> {
    let day: u32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid weekday '{}'", s))?;
    if day > 6 {
        return Err(anyhow!("Weekday must be 0 (Sunday) - 6 (Saturday), got {}", day));
    }
    Ok(day)
}

#[allow(dead_code)]
pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {}", ccy, d.round_dp(2))
}

/// Resolves the date commands reason about. `--as-of` overrides the local
/// clock so due/overdue computations are deterministic under test.
pub fn as_of_date(arg: Option<&String>) -> Result<NaiveDate> {
    match arg {
        Some(s) => parse_date(s.trim()),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn id_for_account(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM accounts WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Account '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_card(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM cards WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Card '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_subscription(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM subscriptions WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Subscription '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}

// Reminder window settings
pub fn get_reminder_days(conn: &Connection) -> Result<i64> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='reminder_days'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match v {
        Some(s) => s
            .parse::<i64>()
            .with_context(|| format!("Invalid reminder_days setting '{}'", s)),
        None => Ok(7),
    }
}

pub fn set_reminder_days(conn: &Connection, days: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('reminder_days', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![days.to_string()],
    )?;
    Ok(())
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
