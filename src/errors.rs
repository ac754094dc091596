// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failure taxonomy for the ledger engine. Everything here is rejected
/// before any mutation is committed; commands surface these to the caller
/// via anyhow.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input: missing/conflicting references, non-positive
    /// amount, currency mismatch. Recoverable by correcting the input.
    #[error("validation: {0}")]
    Validation(String),

    /// Transition out of a terminal state (paying a cancelled invoice).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Subscription is inactive or its billing date has not arrived.
    /// Safe to retry on a later tick.
    #[error("not due: {0}")]
    NotDue(String),

    /// A compare-and-set lost against a concurrent writer. Retry the
    /// whole operation from fresh state.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
