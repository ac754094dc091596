// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::invoices;
use crate::models::{BillingCycle, PaymentSource, QrBillPayload};
use crate::utils::{
    as_of_date, id_for_account, id_for_card, maybe_print_json, parse_amount, parse_billing_day,
    parse_date, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};
use serde::Serialize;

static IBAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{2}[A-Z0-9]{9,30}$").expect("static pattern"));

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("pay", sub)) => pay(conn, sub)?,
        Some(("cancel", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            invoices::cancel_invoice(conn, id)?;
            println!("Cancelled invoice {}", id);
        }
        Some(("refresh", sub)) => {
            let today = as_of_date(sub.get_one::<String>("as-of"))?;
            let n = invoices::refresh_all(conn, today)?;
            println!("Marked {} invoice(s) overdue as of {}", n, today);
        }
        _ => {}
    }
    Ok(())
}

/// `--qr-json` takes the external QR-bill parser's output, either inline
/// JSON or `@path`. Explicit flags override payload fields.
fn qr_payload(sub: &clap::ArgMatches) -> Result<Option<QrBillPayload>> {
    let raw = match sub.get_one::<String>("qr-json") {
        Some(s) => s.trim().to_string(),
        None => return Ok(None),
    };
    let text = if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Read QR payload {}", path))?
    } else {
        raw
    };
    let payload: QrBillPayload =
        serde_json::from_str(&text).context("Invalid QR-bill payload JSON")?;
    let iban = payload.iban.replace(' ', "").to_uppercase();
    if !IBAN_RE.is_match(&iban) {
        return Err(anyhow!("QR payload has malformed IBAN '{}'", payload.iban));
    }
    Ok(Some(QrBillPayload { iban, ..payload }))
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let qr = qr_payload(sub)?;

    let creditor = sub
        .get_one::<String>("creditor")
        .map(|s| s.trim().to_string())
        .or_else(|| qr.as_ref().map(|q| q.creditor_name.clone()))
        .ok_or_else(|| anyhow!("--creditor is required (or provide --qr-json)"))?;
    let amount = match sub.get_one::<String>("amount") {
        Some(s) => parse_amount(s)?,
        None => qr
            .as_ref()
            .and_then(|q| q.amount)
            .ok_or_else(|| anyhow!("--amount is required (payload carries none)"))?,
    };
    let currency = sub
        .get_one::<String>("currency")
        .map(|s| s.trim().to_uppercase())
        .or_else(|| qr.as_ref().and_then(|q| q.currency.clone()))
        .unwrap_or_else(|| "CHF".to_string());
    let iban = sub
        .get_one::<String>("iban")
        .map(|s| s.trim().to_string())
        .or_else(|| qr.as_ref().map(|q| q.iban.clone()));
    let reference = sub
        .get_one::<String>("reference")
        .cloned()
        .or_else(|| qr.as_ref().and_then(|q| q.reference.clone()));
    let message = sub
        .get_one::<String>("message")
        .cloned()
        .or_else(|| qr.as_ref().and_then(|q| q.message.clone()));

    let issue_date = match sub.get_one::<String>("issue-date") {
        Some(s) => parse_date(s.trim())?,
        None => chrono::Local::now().date_naive(),
    };
    let due_date = sub
        .get_one::<String>("due-date")
        .map(|s| parse_date(s.trim()))
        .transpose()?;

    let recurring = sub.get_flag("recurring");
    let (frequency, billing_day) = if recurring {
        let freq = BillingCycle::parse_invoice_frequency(
            sub.get_one::<String>("frequency")
                .ok_or_else(|| anyhow!("--recurring requires --frequency"))?
                .trim(),
        )?;
        let day = parse_billing_day(
            sub.get_one::<String>("billing-day")
                .ok_or_else(|| anyhow!("--recurring requires --billing-day"))?,
        )?;
        if due_date.is_none() {
            return Err(anyhow!("--recurring requires --due-date for the first cycle"));
        }
        (Some(freq), Some(day))
    } else {
        (None, None)
    };

    conn.execute(
        "INSERT INTO invoices(creditor, iban, reference, message, amount, currency,
             issue_date, due_date, is_recurring, frequency, billing_day, next_due_date)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        params![
            creditor,
            iban,
            reference,
            message,
            amount.to_string(),
            currency,
            issue_date.to_string(),
            due_date.map(|d| d.to_string()),
            recurring,
            frequency.map(|f| f.as_str()),
            billing_day,
            // For a recurring invoice the open cycle's due date is the
            // next due date.
            due_date.filter(|_| recurring).map(|d| d.to_string()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    println!("Added invoice {} from '{}' ({} {})", id, creditor, amount, currency);
    Ok(())
}

fn pay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let today = as_of_date(sub.get_one::<String>("as-of"))?;
    let create_tx = !sub.get_flag("no-transaction");

    let source = match (
        sub.get_one::<String>("account"),
        sub.get_one::<String>("card"),
    ) {
        (Some(_), Some(_)) => return Err(anyhow!("Use either --account or --card, not both")),
        (Some(a), None) => PaymentSource::Account(id_for_account(conn, a.trim())?),
        (None, Some(c)) => PaymentSource::Card(id_for_card(conn, c.trim())?),
        (None, None) => default_source(conn)?,
    };

    let tx_id = invoices::pay_invoice(conn, id, source, create_tx, today)?;
    match tx_id {
        Some(t) => println!("Paid invoice {} (expense tx {})", id, t),
        None => println!("Marked invoice {} paid (no transaction)", id),
    }
    Ok(())
}

/// Falls back to the default account when no payment source is given.
fn default_source(conn: &Connection) -> Result<PaymentSource> {
    let id: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE is_default=1", [], |r| {
            r.get(0)
        })
        .ok();
    id.map(PaymentSource::Account)
        .ok_or_else(|| anyhow!("No --account/--card given and no default account set"))
}

#[derive(Serialize)]
struct InvoiceRow {
    id: i64,
    creditor: String,
    amount: String,
    currency: String,
    status: String,
    due_date: String,
    paid_date: String,
    recurring: bool,
    times_paid: i64,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let today = as_of_date(sub.get_one::<String>("as-of"))?;
    let status_filter = sub.get_one::<String>("status").map(|s| s.trim().to_string());

    let mut stmt = conn.prepare(
        "SELECT id, creditor, amount, currency, status, due_date, paid_date,
                is_recurring, times_paid
         FROM invoices ORDER BY due_date IS NULL, due_date, id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, Option<String>>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, bool>(7)?,
            r.get::<_, i64>(8)?,
        ))
    })?;

    let mut data = Vec::new();
    for row in rows {
        let (id, creditor, amount, currency, mut status, due, paid, recurring, times_paid) = row?;
        // Overdue is derived; display it even if `refresh` hasn't run.
        if status == "pending" {
            if let Some(d) = due.as_deref() {
                if let Ok(d) = d.parse::<chrono::NaiveDate>() {
                    if d < today {
                        status = "overdue".to_string();
                    }
                }
            }
        }
        if let Some(ref want) = status_filter {
            if &status != want {
                continue;
            }
        }
        data.push(InvoiceRow {
            id,
            creditor,
            amount,
            currency,
            status,
            due_date: due.unwrap_or_default(),
            paid_date: paid.unwrap_or_default(),
            recurring,
            times_paid,
        });
    }

    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|i| {
                vec![
                    i.id.to_string(),
                    i.creditor.clone(),
                    i.amount.clone(),
                    i.currency.clone(),
                    i.status.clone(),
                    i.due_date.clone(),
                    i.paid_date.clone(),
                    if i.recurring { "yes".into() } else { String::new() },
                    i.times_paid.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Creditor", "Amount", "CCY", "Status", "Due", "Paid", "Recurring", "Times"],
                rows
            )
        );
    }
    Ok(())
}
