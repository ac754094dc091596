// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Invoice lifecycle: pending -> paid | overdue | cancelled. Overdue is a
//! function of (status, due_date, today); `refresh_all` persists it for
//! querying but payment and cancellation never require a prior refresh.
//! Paying a recurring invoice advances the same row into its next cycle.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::dates::advance_by_cycle;
use crate::errors::{LedgerError, Result};
use crate::ledger;
use crate::models::{
    BillingCycle, Invoice, InvoiceStatus, PaymentSource, TransactionInput, TransactionKind,
};

/// Derives overdue state. Returns true when the status changed.
pub fn refresh_status(invoice: &mut Invoice, today: NaiveDate) -> bool {
    if invoice.status == InvoiceStatus::Pending {
        if let Some(due) = invoice.due_date {
            if due < today {
                invoice.status = InvoiceStatus::Overdue;
                return true;
            }
        }
    }
    false
}

/// Persists the derived overdue state for every pending invoice whose due
/// date has passed. Returns how many rows flipped.
pub fn refresh_all(conn: &Connection, today: NaiveDate) -> Result<usize> {
    let n = conn.execute(
        "UPDATE invoices SET status='overdue'
         WHERE status='pending' AND due_date IS NOT NULL AND due_date < ?1",
        params![today.to_string()],
    )?;
    Ok(n)
}

pub fn load_invoice(sql: &Connection, id: i64) -> Result<Invoice> {
    let row = sql
        .query_row(
            "SELECT id, creditor, iban, reference, message, amount, currency, status,
                    issue_date, due_date, paid_date, is_recurring, frequency,
                    billing_day, times_paid, next_due_date
             FROM invoices WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                    r.get::<_, String>(8)?,
                    r.get::<_, Option<String>>(9)?,
                    r.get::<_, Option<String>>(10)?,
                    r.get::<_, bool>(11)?,
                    r.get::<_, Option<String>>(12)?,
                    r.get::<_, Option<u32>>(13)?,
                    r.get::<_, i64>(14)?,
                    r.get::<_, Option<String>>(15)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::Validation(format!("invoice {} not found", id)))?;

    let parse_day = |s: &str| {
        s.parse::<NaiveDate>()
            .map_err(|_| LedgerError::Validation(format!("invalid stored date '{}'", s)))
    };
    Ok(Invoice {
        id: row.0,
        creditor: row.1,
        iban: row.2,
        reference: row.3,
        message: row.4,
        amount: row
            .5
            .parse()
            .map_err(|_| LedgerError::Validation(format!("invalid stored amount '{}'", row.5)))?,
        currency: row.6,
        status: InvoiceStatus::parse(&row.7)?,
        issue_date: parse_day(&row.8)?,
        due_date: row.9.as_deref().map(parse_day).transpose()?,
        paid_date: row.10.as_deref().map(parse_day).transpose()?,
        is_recurring: row.11,
        frequency: row
            .12
            .as_deref()
            .map(BillingCycle::parse_invoice_frequency)
            .transpose()?,
        billing_day: row.13,
        times_paid: row.14,
        next_due_date: row.15.as_deref().map(parse_day).transpose()?,
    })
}

fn terminal_check(invoice: &Invoice, verb: &str) -> Result<()> {
    match invoice.status {
        InvoiceStatus::Paid => Err(LedgerError::InvalidState(format!(
            "cannot {} invoice {}: already paid",
            verb, invoice.id
        ))),
        InvoiceStatus::Cancelled => Err(LedgerError::InvalidState(format!(
            "cannot {} invoice {}: cancelled",
            verb, invoice.id
        ))),
        InvoiceStatus::Pending | InvoiceStatus::Overdue => Ok(()),
    }
}

/// Marks an invoice paid, optionally creating the matching expense through
/// the transaction processor in the same SQLite transaction. A credit-card
/// source accrues owed balance; a debit card passes through its linked
/// account. Recurring invoices roll the same row forward: fresh due date
/// from the billing cycle, status back to pending, paid_date cleared.
/// Returns the created transaction id, if any.
pub fn pay_invoice(
    conn: &mut Connection,
    id: i64,
    source: PaymentSource,
    create_transaction: bool,
    today: NaiveDate,
) -> Result<Option<i64>> {
    let sql = conn.transaction()?;
    let invoice = load_invoice(&sql, id)?;
    terminal_check(&invoice, "pay")?;

    let tx_id = if create_transaction {
        let (from_account_id, from_card_id) = match source {
            PaymentSource::Account(a) => (Some(a), None),
            PaymentSource::Card(c) => (None, Some(c)),
        };
        let input = TransactionInput {
            kind: TransactionKind::Expense,
            date: today,
            amount: invoice.amount,
            currency: invoice.currency.clone(),
            from_account_id,
            from_card_id,
            to_account_id: None,
            to_card_id: None,
            category_id: None,
            merchant: Some(invoice.creditor.clone()),
            note: invoice.reference.clone(),
        };
        Some(ledger::create_in_tx(&sql, &input)?)
    } else {
        None
    };

    if invoice.is_recurring {
        let frequency = invoice.frequency.ok_or_else(|| {
            LedgerError::Validation(format!("recurring invoice {} has no frequency", id))
        })?;
        let billing_day = invoice.billing_day.ok_or_else(|| {
            LedgerError::Validation(format!("recurring invoice {} has no billing day", id))
        })?;
        let base = invoice.due_date.unwrap_or(today);
        let next_due = advance_by_cycle(base, frequency, billing_day);
        sql.execute(
            "UPDATE invoices SET status='pending', paid_date=NULL, due_date=?1,
                 next_due_date=?1, times_paid=times_paid+1 WHERE id=?2",
            params![next_due.to_string(), id],
        )?;
    } else {
        sql.execute(
            "UPDATE invoices SET status='paid', paid_date=?1, times_paid=times_paid+1
             WHERE id=?2",
            params![today.to_string(), id],
        )?;
    }
    sql.commit()?;
    Ok(tx_id)
}

/// No balance effect; just closes the invoice for good.
pub fn cancel_invoice(conn: &mut Connection, id: i64) -> Result<()> {
    let sql = conn.transaction()?;
    let invoice = load_invoice(&sql, id)?;
    terminal_check(&invoice, "cancel")?;
    sql.execute(
        "UPDATE invoices SET status='cancelled' WHERE id=?1",
        params![id],
    )?;
    sql.commit()?;
    Ok(())
}
