// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use crate::models::BillingCycle;
use crate::subscriptions;
use crate::utils::{
    as_of_date, get_reminder_days, id_for_account, id_for_card, id_for_category,
    id_for_subscription, maybe_print_json, parse_amount, parse_billing_day, parse_date,
    parse_weekday, pretty_table,
};
use anyhow::{Result, anyhow};
use chrono::Datelike;
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("toggle", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_subscription(conn, name.trim())?;
            let active = subscriptions::toggle(conn, id)?;
            println!(
                "Subscription '{}' is now {}",
                name,
                if active { "active" } else { "paused" }
            );
        }
        Some(("pay-now", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let today = as_of_date(sub.get_one::<String>("as-of"))?;
            let id = id_for_subscription(conn, name.trim())?;
            match subscriptions::process(conn, id, today)? {
                Some(tx) => println!("Charged '{}' (expense tx {})", name, tx),
                None => println!("Processed '{}' (no transaction configured)", name),
            }
        }
        Some(("skip", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let today = as_of_date(sub.get_one::<String>("as-of"))?;
            let id = id_for_subscription(conn, name.trim())?;
            let next = subscriptions::skip(conn, id, today)?;
            println!("Skipped '{}'; next billing {}", name, next);
        }
        Some(("run-due", sub)) => run_due(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let cycle = BillingCycle::parse(sub.get_one::<String>("cycle").unwrap().trim())?;
    let start = parse_date(sub.get_one::<String>("start").unwrap().trim())?;
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_date(s.trim()))
        .transpose()?;

    let billing_day = match (cycle, sub.get_one::<String>("billing-day")) {
        (BillingCycle::Daily, _) => 1,
        (BillingCycle::Weekly, Some(s)) => parse_weekday(s)?,
        (BillingCycle::Weekly, None) => start.weekday().num_days_from_sunday(),
        (_, Some(s)) => parse_billing_day(s)?,
        (_, None) => start.day(),
    };

    let account = sub.get_one::<String>("account");
    let card = sub.get_one::<String>("card");
    if account.is_some() && card.is_some() {
        return Err(anyhow!("Use either --account or --card, not both"));
    }
    let auto_tx = !sub.get_flag("no-auto-tx");
    if auto_tx && account.is_none() && card.is_none() {
        return Err(anyhow!(
            "A payment method (--account or --card) is required unless --no-auto-tx"
        ));
    }
    let account_id = account.map(|a| id_for_account(conn, a.trim())).transpose()?;
    let card_id = card.map(|c| id_for_card(conn, c.trim())).transpose()?;
    let category_id = sub
        .get_one::<String>("category")
        .map(|c| id_for_category(conn, c.trim()))
        .transpose()?;

    // First billing happens on the start date itself.
    conn.execute(
        "INSERT INTO subscriptions(name, amount, currency, billing_cycle, billing_day,
             start_date, end_date, is_active, auto_create_transaction, account_id,
             card_id, category_id, next_billing_date)
         VALUES (?1,?2,?3,?4,?5,?6,?7,1,?8,?9,?10,?11,?12)",
        params![
            name,
            amount.to_string(),
            currency,
            cycle.as_str(),
            billing_day,
            start.to_string(),
            end.map(|d| d.to_string()),
            auto_tx,
            account_id,
            card_id,
            category_id,
            start.to_string(),
        ],
    )?;
    println!(
        "Added subscription '{}' ({} {} {})",
        name,
        amount,
        currency,
        cycle.as_str()
    );
    Ok(())
}

#[derive(Serialize)]
struct SubscriptionRow {
    name: String,
    amount: String,
    currency: String,
    cycle: String,
    next_billing: String,
    state: String,
    payment_method: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let today = as_of_date(sub.get_one::<String>("as-of"))?;
    let only_due = sub.get_flag("due");
    let only_overdue = sub.get_flag("overdue");
    let only_due_soon = sub.get_flag("due-soon");
    let reminder_days = get_reminder_days(conn)?;

    let ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM subscriptions ORDER BY next_billing_date, name")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut data = Vec::new();
    for id in ids {
        let s = subscriptions::load_subscription(conn, id)?;
        if only_due && !subscriptions::is_due(&s, today) {
            continue;
        }
        if only_overdue && !subscriptions::is_overdue(&s, today) {
            continue;
        }
        if only_due_soon && !subscriptions::is_due_soon(&s, today, reminder_days) {
            continue;
        }
        let state = if !s.is_active {
            "paused"
        } else if subscriptions::is_overdue(&s, today) {
            "overdue"
        } else if subscriptions::is_due(&s, today) {
            "due"
        } else if subscriptions::is_due_soon(&s, today, reminder_days) {
            "due soon"
        } else {
            "active"
        };
        let method = match (s.account_id, s.card_id) {
            (Some(a), _) => format!("account {}", a),
            (_, Some(c)) => format!("card {}", c),
            _ => String::new(),
        };
        data.push(SubscriptionRow {
            name: s.name,
            amount: s.amount.to_string(),
            currency: s.currency,
            cycle: s.billing_cycle.as_str().to_string(),
            next_billing: s.next_billing_date.to_string(),
            state: state.to_string(),
            payment_method: method,
        });
    }

    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.amount.clone(),
                    s.currency.clone(),
                    s.cycle.clone(),
                    s.next_billing.clone(),
                    s.state.clone(),
                    s.payment_method.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Amount", "CCY", "Cycle", "Next billing", "State", "Method"],
                rows
            )
        );
    }
    Ok(())
}

/// One scheduler tick. Failures are reported per subscription; the batch
/// always completes.
fn run_due(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = as_of_date(sub.get_one::<String>("as-of"))?;
    let outcomes = subscriptions::run_due(conn, today)?;
    if outcomes.is_empty() {
        println!("Nothing due as of {}", today);
        return Ok(());
    }
    let mut rows = Vec::new();
    for o in &outcomes {
        let detail = match &o.result {
            Ok(Some(tx)) => format!("charged (tx {})", tx),
            Ok(None) => "processed".to_string(),
            Err(LedgerError::NotDue(msg)) => format!("skipped: {}", msg),
            Err(e) => format!("failed: {}", e),
        };
        rows.push(vec![o.id.to_string(), o.name.clone(), detail]);
    }
    println!("{}", pretty_table(&["Id", "Name", "Outcome"], rows));
    Ok(())
}
