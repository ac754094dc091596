// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurrence scheduler. `next_billing_date` is the idempotence token: it
//! only advances through a compare-and-set in the same SQLite transaction
//! as the charge, so a billing period is charged at most once. A failed
//! charge rolls everything back and the next tick retries the same period.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Transaction as SqlTx, params};

use crate::dates::{advance_by_cycle, days_between};
use crate::errors::{LedgerError, Result};
use crate::ledger;
use crate::models::{
    BillingCycle, PaymentSource, Subscription, TransactionInput, TransactionKind,
};

pub fn is_due(sub: &Subscription, today: NaiveDate) -> bool {
    sub.is_active && sub.next_billing_date <= today
}

/// Grace window is zero: anything due and not yet processed shows as
/// overdue.
pub fn is_overdue(sub: &Subscription, today: NaiveDate) -> bool {
    is_due(sub, today) && days_between(sub.next_billing_date, today) > 0
}

pub fn is_due_soon(sub: &Subscription, today: NaiveDate, reminder_days: i64) -> bool {
    if !sub.is_active {
        return false;
    }
    let ahead = days_between(today, sub.next_billing_date);
    (0..=reminder_days).contains(&ahead)
}

pub fn load_subscription(sql: &Connection, id: i64) -> Result<Subscription> {
    let row = sql
        .query_row(
            "SELECT id, name, amount, currency, billing_cycle, billing_day, start_date,
                    end_date, is_active, auto_create_transaction, account_id, card_id,
                    category_id, next_billing_date, last_processed_date
             FROM subscriptions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, u32>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, Option<String>>(7)?,
                    r.get::<_, bool>(8)?,
                    r.get::<_, bool>(9)?,
                    r.get::<_, Option<i64>>(10)?,
                    r.get::<_, Option<i64>>(11)?,
                    r.get::<_, Option<i64>>(12)?,
                    r.get::<_, String>(13)?,
                    r.get::<_, Option<String>>(14)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::Validation(format!("subscription {} not found", id)))?;

    let parse_day = |s: &str| {
        s.parse::<NaiveDate>()
            .map_err(|_| LedgerError::Validation(format!("invalid stored date '{}'", s)))
    };
    Ok(Subscription {
        id: row.0,
        name: row.1,
        amount: row
            .2
            .parse()
            .map_err(|_| LedgerError::Validation(format!("invalid stored amount '{}'", row.2)))?,
        currency: row.3,
        billing_cycle: BillingCycle::parse(&row.4)?,
        billing_day: row.5,
        start_date: parse_day(&row.6)?,
        end_date: row.7.as_deref().map(parse_day).transpose()?,
        is_active: row.8,
        auto_create_transaction: row.9,
        account_id: row.10,
        card_id: row.11,
        category_id: row.12,
        next_billing_date: parse_day(&row.13)?,
        last_processed_date: row.14.as_deref().map(parse_day).transpose()?,
    })
}

fn due_guard(sub: &Subscription, today: NaiveDate) -> Result<()> {
    if !sub.is_active {
        return Err(LedgerError::NotDue(format!(
            "subscription '{}' is paused",
            sub.name
        )));
    }
    if sub.next_billing_date > today {
        return Err(LedgerError::NotDue(format!(
            "subscription '{}' is next due {}",
            sub.name, sub.next_billing_date
        )));
    }
    if let Some(end) = sub.end_date {
        if sub.next_billing_date > end {
            return Err(LedgerError::NotDue(format!(
                "subscription '{}' ended {}",
                sub.name, end
            )));
        }
    }
    Ok(())
}

/// Check-and-advance as one compare-and-set. Losing the race means a
/// concurrent tick already charged this period; nothing is committed.
fn advance_billing_date(sql: &SqlTx, sub: &Subscription) -> Result<NaiveDate> {
    let new_next = advance_by_cycle(sub.next_billing_date, sub.billing_cycle, sub.billing_day);
    let n = sql.execute(
        "UPDATE subscriptions SET next_billing_date=?1, last_processed_date=?2
         WHERE id=?3 AND next_billing_date=?2",
        params![
            new_next.to_string(),
            sub.next_billing_date.to_string(),
            sub.id
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::ConcurrencyConflict(format!(
            "subscription '{}' was processed concurrently",
            sub.name
        )));
    }
    if let Some(end) = sub.end_date {
        if new_next > end {
            sql.execute(
                "UPDATE subscriptions SET is_active=0 WHERE id=?1",
                params![sub.id],
            )?;
        }
    }
    Ok(new_next)
}

/// Charges one due billing period and advances the schedule. This is both
/// the scheduler tick body and the manual "pay now" action. Returns the
/// created transaction id when auto_create_transaction is set.
pub fn process(conn: &mut Connection, id: i64, today: NaiveDate) -> Result<Option<i64>> {
    let sql = conn.transaction()?;
    let sub = load_subscription(&sql, id)?;
    due_guard(&sub, today)?;

    let tx_id = if sub.auto_create_transaction {
        let source = sub.payment_source().ok_or_else(|| {
            LedgerError::Validation(format!(
                "subscription '{}' has no payment method",
                sub.name
            ))
        })?;
        let (from_account_id, from_card_id) = match source {
            PaymentSource::Account(a) => (Some(a), None),
            PaymentSource::Card(c) => (None, Some(c)),
        };
        let input = TransactionInput {
            kind: TransactionKind::Expense,
            date: sub.next_billing_date,
            amount: sub.amount,
            currency: sub.currency.clone(),
            from_account_id,
            from_card_id,
            to_account_id: None,
            to_card_id: None,
            category_id: sub.category_id,
            merchant: Some(sub.name.clone()),
            note: None,
        };
        Some(ledger::create_in_tx(&sql, &input)?)
    } else {
        None
    };

    advance_billing_date(&sql, &sub)?;
    sql.commit()?;
    Ok(tx_id)
}

/// Advances past the current period without charging.
pub fn skip(conn: &mut Connection, id: i64, today: NaiveDate) -> Result<NaiveDate> {
    let sql = conn.transaction()?;
    let sub = load_subscription(&sql, id)?;
    due_guard(&sub, today)?;
    let next = advance_billing_date(&sql, &sub)?;
    sql.commit()?;
    Ok(next)
}

/// Pause/resume. Paused subscriptions are skipped by the scheduler and
/// refuse manual processing until resumed.
pub fn toggle(conn: &mut Connection, id: i64) -> Result<bool> {
    let sql = conn.transaction()?;
    let sub = load_subscription(&sql, id)?;
    let now_active = !sub.is_active;
    sql.execute(
        "UPDATE subscriptions SET is_active=?1 WHERE id=?2",
        params![now_active, id],
    )?;
    sql.commit()?;
    Ok(now_active)
}

pub struct TickOutcome {
    pub id: i64,
    pub name: String,
    pub result: Result<Option<i64>>,
}

/// Scheduler tick: processes every active subscription whose billing date
/// has arrived. One broken subscription never aborts the batch; each
/// outcome is reported to the caller.
pub fn run_due(conn: &mut Connection, today: NaiveDate) -> Result<Vec<TickOutcome>> {
    let due: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(
            "SELECT id, name FROM subscriptions
             WHERE is_active=1 AND next_billing_date <= ?1
             ORDER BY next_billing_date, id",
        )?;
        let rows = stmt.query_map(params![today.to_string()], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut outcomes = Vec::with_capacity(due.len());
    for (id, name) in due {
        let result = process(conn, id, today);
        outcomes.push(TickOutcome { id, name, result });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_snapshot_loses_billing_date_cas() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO subscriptions(name, amount, currency, billing_cycle, billing_day,
                 start_date, next_billing_date)
             VALUES ('Netflix','18.90','CHF','monthly',15,'2024-01-15','2024-01-15')",
            [],
        )
        .unwrap();
        let stale = load_subscription(&conn, 1).unwrap();

        let sql = conn.transaction().unwrap();
        advance_billing_date(&sql, &stale).unwrap();
        sql.commit().unwrap();

        // The snapshot's next_billing_date no longer matches the row, so
        // the compare-and-set must refuse a second advance.
        let sql = conn.transaction().unwrap();
        let err = advance_billing_date(&sql, &stale).unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));

        drop(sql);
        let sub = load_subscription(&conn, 1).unwrap();
        assert_eq!(
            sub.next_billing_date,
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
        );
    }
}
