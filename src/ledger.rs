// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction processor: the only code path that mutates account and card
//! balances. Every public entry point runs inside one SQLite transaction,
//! so a balance write and its transaction row commit together or not at
//! all. Reversal applies the exact negation of the original effects, which
//! is what edit and delete are built from.

use rusqlite::{Connection, OptionalExtension, Transaction as SqlTx, params};
use rust_decimal::Decimal;

use crate::errors::{LedgerError, Result};
use crate::models::{CardKind, Transaction, TransactionInput, TransactionKind};

fn dec(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| LedgerError::Validation(format!("invalid stored amount '{}'", s)))
}

struct AccountRow {
    id: i64,
    currency: String,
    raw_balance: String,
    balance: Decimal,
}

struct CardRow {
    id: i64,
    kind: CardKind,
    currency: String,
    account_id: Option<i64>,
    credit_limit: Option<Decimal>,
    raw_balance: Option<String>,
    current_balance: Option<Decimal>,
}

fn load_account(sql: &SqlTx, id: i64) -> Result<AccountRow> {
    let row = sql
        .query_row(
            "SELECT id, currency, balance FROM accounts WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::Validation(format!("account {} not found", id)))?;
    let balance = dec(&row.2)?;
    Ok(AccountRow {
        id: row.0,
        currency: row.1,
        raw_balance: row.2,
        balance,
    })
}

fn load_card(sql: &SqlTx, id: i64) -> Result<CardRow> {
    let row = sql
        .query_row(
            "SELECT id, kind, currency, account_id, credit_limit, current_balance
             FROM cards WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<i64>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::Validation(format!("card {} not found", id)))?;
    let kind = CardKind::parse(&row.1)?;
    let credit_limit = row.4.as_deref().map(dec).transpose()?;
    let current_balance = row.5.as_deref().map(dec).transpose()?;
    Ok(CardRow {
        id: row.0,
        kind,
        currency: row.2,
        account_id: row.3,
        credit_limit,
        raw_balance: row.5,
        current_balance,
    })
}

/// Compare-and-set balance write. Zero affected rows means another writer
/// got there first; the enclosing SQLite transaction is dropped uncommitted.
fn set_account_balance(sql: &SqlTx, account: &AccountRow, new: Decimal) -> Result<()> {
    let n = sql.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2 AND balance=?3",
        params![new.to_string(), account.id, account.raw_balance],
    )?;
    if n == 0 {
        return Err(LedgerError::ConcurrencyConflict(format!(
            "account {} balance changed concurrently",
            account.id
        )));
    }
    Ok(())
}

fn set_card_balance(sql: &SqlTx, card: &CardRow, new: Decimal) -> Result<()> {
    let n = sql.execute(
        "UPDATE cards SET current_balance=?1 WHERE id=?2 AND current_balance IS ?3",
        params![new.to_string(), card.id, card.raw_balance],
    )?;
    if n == 0 {
        return Err(LedgerError::ConcurrencyConflict(format!(
            "card {} balance changed concurrently",
            card.id
        )));
    }
    Ok(())
}

/// Shape checks that need no database access: amount sign and the
/// source/destination slots a kind requires. Exactly one source slot and
/// one destination slot where the kind calls for them, none elsewhere.
pub fn validate_slots(t: &TransactionInput) -> Result<()> {
    if t.amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {}",
            t.amount
        )));
    }
    let src = (t.from_account_id.is_some(), t.from_card_id.is_some());
    let dst = (t.to_account_id.is_some(), t.to_card_id.is_some());
    let err = |msg: &str| Err(LedgerError::Validation(msg.to_string()));
    match t.kind {
        TransactionKind::Income => {
            if src != (false, false) {
                return err("income takes no source");
            }
            if dst == (false, false) || dst == (true, true) {
                return err("income requires exactly one of to-account or to-card");
            }
        }
        TransactionKind::Expense => {
            if dst != (false, false) {
                return err("expense takes no destination");
            }
            if src == (false, false) || src == (true, true) {
                return err("expense requires exactly one of from-account or from-card");
            }
        }
        TransactionKind::Transfer => {
            if src != (true, false) || dst != (true, false) {
                return err("transfer requires from-account and to-account");
            }
            if t.from_account_id == t.to_account_id {
                return err("transfer source and destination accounts must differ");
            }
        }
        TransactionKind::CardPayment => {
            if src != (true, false) || dst != (false, true) {
                return err("card payment requires from-account and to-card");
            }
        }
    }
    Ok(())
}

fn require_currency(t: &TransactionInput, instrument: &str, what: &str) -> Result<()> {
    if !t.currency.eq_ignore_ascii_case(instrument) {
        return Err(LedgerError::Validation(format!(
            "transaction currency '{}' does not match {} currency '{}'",
            t.currency, what, instrument
        )));
    }
    Ok(())
}

/// Applies (direction = 1) or reverses (direction = -1) the balance
/// effects of a transaction. Exactly one balance write per populated
/// reference; all writes are CAS-guarded within the caller's transaction.
fn apply_effects(sql: &SqlTx, t: &TransactionInput, direction: Decimal) -> Result<()> {
    let signed = t.amount * direction;
    let forward = direction > Decimal::ZERO;
    match t.kind {
        TransactionKind::Income => {
            if let Some(id) = t.to_account_id {
                let acct = load_account(sql, id)?;
                require_currency(t, &acct.currency, "destination account")?;
                set_account_balance(sql, &acct, acct.balance + signed)?;
            } else if let Some(id) = t.to_card_id {
                // Cashback/refund onto a credit card reduces what's owed.
                let card = load_card(sql, id)?;
                if card.kind != CardKind::Credit {
                    return Err(LedgerError::Validation(format!(
                        "income to card {} requires a credit card",
                        card.id
                    )));
                }
                require_currency(t, &card.currency, "destination card")?;
                let owed = card.current_balance.unwrap_or(Decimal::ZERO);
                set_card_balance(sql, &card, owed - signed)?;
            }
        }
        TransactionKind::Expense => {
            if let Some(id) = t.from_account_id {
                let acct = load_account(sql, id)?;
                require_currency(t, &acct.currency, "source account")?;
                set_account_balance(sql, &acct, acct.balance - signed)?;
            } else if let Some(id) = t.from_card_id {
                let card = load_card(sql, id)?;
                require_currency(t, &card.currency, "source card")?;
                match card.kind {
                    CardKind::Credit => {
                        let owed = card.current_balance.unwrap_or(Decimal::ZERO);
                        let new_owed = owed + signed;
                        set_card_balance(sql, &card, new_owed)?;
                        if forward {
                            if let Some(limit) = card.credit_limit {
                                if new_owed > limit {
                                    eprintln!(
                                        "warning: card {} over its credit limit ({} > {})",
                                        card.id, new_owed, limit
                                    );
                                }
                            }
                        }
                    }
                    CardKind::Debit => {
                        // Debit cards hold no balance; spend hits the
                        // linked account.
                        let linked = card.account_id.ok_or_else(|| {
                            LedgerError::Validation(format!(
                                "debit card {} has no linked account",
                                card.id
                            ))
                        })?;
                        let acct = load_account(sql, linked)?;
                        set_account_balance(sql, &acct, acct.balance - signed)?;
                    }
                }
            }
        }
        TransactionKind::Transfer => {
            let from = load_account(sql, t.from_account_id.unwrap_or_default())?;
            let to = load_account(sql, t.to_account_id.unwrap_or_default())?;
            if !from.currency.eq_ignore_ascii_case(&to.currency) {
                return Err(LedgerError::Validation(format!(
                    "cannot transfer between currencies without conversion ({} -> {})",
                    from.currency, to.currency
                )));
            }
            require_currency(t, &from.currency, "source account")?;
            set_account_balance(sql, &from, from.balance - signed)?;
            set_account_balance(sql, &to, to.balance + signed)?;
        }
        TransactionKind::CardPayment => {
            let from = load_account(sql, t.from_account_id.unwrap_or_default())?;
            let card = load_card(sql, t.to_card_id.unwrap_or_default())?;
            if card.kind != CardKind::Credit {
                return Err(LedgerError::Validation(format!(
                    "card payment destination {} must be a credit card",
                    card.id
                )));
            }
            require_currency(t, &from.currency, "source account")?;
            require_currency(t, &card.currency, "destination card")?;
            let owed = card.current_balance.unwrap_or(Decimal::ZERO);
            set_account_balance(sql, &from, from.balance - signed)?;
            set_card_balance(sql, &card, owed - signed)?;
        }
    }
    Ok(())
}

fn insert_row(sql: &SqlTx, t: &TransactionInput) -> Result<i64> {
    sql.execute(
        "INSERT INTO transactions(kind, date, amount, currency, from_account_id,
             from_card_id, to_account_id, to_card_id, category_id, merchant, note)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            t.kind.as_str(),
            t.date.to_string(),
            t.amount.to_string(),
            t.currency,
            t.from_account_id,
            t.from_card_id,
            t.to_account_id,
            t.to_card_id,
            t.category_id,
            t.merchant,
            t.note
        ],
    )?;
    Ok(sql.last_insert_rowid())
}

pub fn load_transaction(sql: &SqlTx, id: i64) -> Result<Transaction> {
    let t = sql
        .query_row(
            "SELECT id, kind, date, amount, currency, from_account_id, from_card_id,
                    to_account_id, to_card_id, category_id, merchant, note
             FROM transactions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, Option<i64>>(5)?,
                    r.get::<_, Option<i64>>(6)?,
                    r.get::<_, Option<i64>>(7)?,
                    r.get::<_, Option<i64>>(8)?,
                    r.get::<_, Option<i64>>(9)?,
                    r.get::<_, Option<String>>(10)?,
                    r.get::<_, Option<String>>(11)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::Validation(format!("transaction {} not found", id)))?;
    let date = t
        .2
        .parse()
        .map_err(|_| LedgerError::Validation(format!("invalid stored date '{}'", t.2)))?;
    Ok(Transaction {
        id: t.0,
        kind: TransactionKind::parse(&t.1)?,
        date,
        amount: dec(&t.3)?,
        currency: t.4,
        from_account_id: t.5,
        from_card_id: t.6,
        to_account_id: t.7,
        to_card_id: t.8,
        category_id: t.9,
        merchant: t.10,
        note: t.11,
    })
}

fn as_input(t: &Transaction) -> TransactionInput {
    TransactionInput {
        kind: t.kind,
        date: t.date,
        amount: t.amount,
        currency: t.currency.clone(),
        from_account_id: t.from_account_id,
        from_card_id: t.from_card_id,
        to_account_id: t.to_account_id,
        to_card_id: t.to_card_id,
        category_id: t.category_id,
        merchant: t.merchant.clone(),
        note: t.note.clone(),
    }
}

/// Create + apply inside a caller-owned SQLite transaction. The invoice
/// and subscription engines use this so their row change and the charge
/// commit as one unit.
pub fn create_in_tx(sql: &SqlTx, input: &TransactionInput) -> Result<i64> {
    validate_slots(input)?;
    apply_effects(sql, input, Decimal::ONE)?;
    insert_row(sql, input)
}

pub fn create_transaction(conn: &mut Connection, input: &TransactionInput) -> Result<i64> {
    validate_slots(input)?;
    let sql = conn.transaction()?;
    apply_effects(&sql, input, Decimal::ONE)?;
    let id = insert_row(&sql, input)?;
    sql.commit()?;
    Ok(id)
}

/// Removes a transaction and restores every touched balance to its
/// pre-apply value.
pub fn delete_transaction(conn: &mut Connection, id: i64) -> Result<()> {
    let sql = conn.transaction()?;
    let old = load_transaction(&sql, id)?;
    apply_effects(&sql, &as_input(&old), -Decimal::ONE)?;
    sql.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    sql.commit()?;
    Ok(())
}

/// Edit = reverse(old) then apply(new) as one atomic unit, so historical
/// balance drift never accumulates.
pub fn update_transaction(conn: &mut Connection, id: i64, input: &TransactionInput) -> Result<()> {
    validate_slots(input)?;
    let sql = conn.transaction()?;
    let old = load_transaction(&sql, id)?;
    apply_effects(&sql, &as_input(&old), -Decimal::ONE)?;
    apply_effects(&sql, input, Decimal::ONE)?;
    sql.execute(
        "UPDATE transactions SET kind=?1, date=?2, amount=?3, currency=?4,
             from_account_id=?5, from_card_id=?6, to_account_id=?7, to_card_id=?8,
             category_id=?9, merchant=?10, note=?11
         WHERE id=?12",
        params![
            input.kind.as_str(),
            input.date.to_string(),
            input.amount.to_string(),
            input.currency,
            input.from_account_id,
            input.from_card_id,
            input.to_account_id,
            input.to_card_id,
            input.category_id,
            input.merchant,
            input.note,
            id
        ],
    )?;
    sql.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_snapshot_loses_balance_cas() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO accounts(name, currency, balance, opening_balance)
             VALUES ('Main','CHF','500','500')",
            [],
        )
        .unwrap();

        let sql = conn.transaction().unwrap();
        let stale = load_account(&sql, 1).unwrap();
        // Another writer moves the balance between snapshot and write.
        sql.execute("UPDATE accounts SET balance='400' WHERE id=1", [])
            .unwrap();
        let err = set_account_balance(&sql, &stale, dec("450").unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));
    }

    #[test]
    fn stale_snapshot_loses_card_balance_cas() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO cards(name, kind, currency, credit_limit, current_balance)
             VALUES ('Visa','credit','CHF','1000','250')",
            [],
        )
        .unwrap();

        let sql = conn.transaction().unwrap();
        let stale = load_card(&sql, 1).unwrap();
        sql.execute("UPDATE cards SET current_balance='300' WHERE id=1", [])
            .unwrap();
        let err = set_card_balance(&sql, &stale, dec("150").unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));
    }
}
