// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
    CardPayment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
            TransactionKind::CardPayment => "card_payment",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "transfer" => Ok(TransactionKind::Transfer),
            "card_payment" => Ok(TransactionKind::CardPayment),
            other => Err(LedgerError::Validation(format!(
                "unknown transaction type '{}' (income|expense|transfer|card_payment)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Debit,
    Credit,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Debit => "debit",
            CardKind::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "debit" => Ok(CardKind::Debit),
            "credit" => Ok(CardKind::Credit),
            other => Err(LedgerError::Validation(format!(
                "unknown card kind '{}' (debit|credit)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Daily => "daily",
            BillingCycle::Weekly => "weekly",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "daily" => Ok(BillingCycle::Daily),
            "weekly" => Ok(BillingCycle::Weekly),
            "monthly" => Ok(BillingCycle::Monthly),
            "quarterly" => Ok(BillingCycle::Quarterly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(LedgerError::Validation(format!(
                "unknown billing cycle '{}' (daily|weekly|monthly|quarterly|yearly)",
                other
            ))),
        }
    }

    /// Invoice frequencies are the calendar subset of billing cycles.
    pub fn parse_invoice_frequency(s: &str) -> Result<Self, LedgerError> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "quarterly" => Ok(BillingCycle::Quarterly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(LedgerError::Validation(format!(
                "unknown invoice frequency '{}' (monthly|quarterly|yearly)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(LedgerError::Validation(format!(
                "unknown invoice status '{}'",
                other
            ))),
        }
    }
}

/// Where a payment is drawn from. Credit cards accrue owed balance,
/// debit cards pass through their linked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSource {
    Account(i64),
    Card(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub currency: String,
    pub balance: Decimal,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub name: String,
    pub kind: CardKind,
    pub currency: String,
    pub account_id: Option<i64>,
    pub credit_limit: Option<Decimal>,
    pub current_balance: Option<Decimal>,
    pub is_default: bool,
}

impl Card {
    /// Remaining spending room on a credit card; never negative. None for
    /// debit cards, which have no balance of their own.
    pub fn available_credit(&self) -> Option<Decimal> {
        match (self.credit_limit, self.current_balance) {
            (Some(limit), Some(owed)) => Some((limit - owed).max(Decimal::ZERO)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub from_account_id: Option<i64>,
    pub from_card_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub to_card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub merchant: Option<String>,
    pub note: Option<String>,
}

/// Input for creating or editing a transaction. The id is assigned by the
/// store; slot/kind consistency is validated by the ledger before any write.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub from_account_id: Option<i64>,
    pub from_card_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub to_card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub merchant: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub creditor: String,
    pub iban: Option<String>,
    pub reference: Option<String>,
    pub message: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub frequency: Option<BillingCycle>,
    pub billing_day: Option<u32>,
    pub times_paid: i64,
    pub next_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub billing_day: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub auto_create_transaction: bool,
    pub account_id: Option<i64>,
    pub card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub next_billing_date: NaiveDate,
    pub last_processed_date: Option<NaiveDate>,
}

impl Subscription {
    pub fn payment_source(&self) -> Option<PaymentSource> {
        match (self.account_id, self.card_id) {
            (Some(id), None) => Some(PaymentSource::Account(id)),
            (None, Some(id)) => Some(PaymentSource::Card(id)),
            _ => None,
        }
    }
}

/// Structured output of the external QR-bill parser. Consumed as-is to
/// prefill an invoice; no parsing happens in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrBillPayload {
    pub creditor_name: String,
    pub iban: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub reference: Option<String>,
    pub message: Option<String>,
}
