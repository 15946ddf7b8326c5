//! Core traits for history sources, budget overlays and time
//!
//! This module defines the seams that let the recommendation engine run over
//! the file-backed stores, the cached facade, or plain in-memory data in tests.

use crate::types::{user_key, LedgerError, Transaction};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;

/// Trait for loading a user's transaction history
///
/// Implementations can read the ledger file directly, serve from a cache, or
/// hold records in memory.
pub trait TransactionSource {
    /// All records belonging to `username` (case-insensitive, trimmed)
    fn history(&self, username: &str) -> Result<Vec<Transaction>, LedgerError>;
}

/// Trait for looking up a user's custom monthly budget
pub trait BudgetOverlay {
    /// The user's override, if one is set
    fn custom_budget(&self, username: &str) -> Option<Decimal>;
}

/// Monotonic time source
///
/// Injected into the transaction cache so expiry can be tested without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl TransactionSource for Vec<Transaction> {
    fn history(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        let key = user_key(username);
        Ok(self.iter().filter(|tx| tx.belongs_to(&key)).cloned().collect())
    }
}

impl<T: TransactionSource + ?Sized> TransactionSource for &T {
    fn history(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        (**self).history(username)
    }
}

impl BudgetOverlay for HashMap<String, Decimal> {
    fn custom_budget(&self, username: &str) -> Option<Decimal> {
        let key = user_key(username);
        self.iter()
            .find(|(name, _)| user_key(name) == key)
            .map(|(_, amount)| *amount)
    }
}

impl<T: BudgetOverlay + ?Sized> BudgetOverlay for &T {
    fn custom_budget(&self, username: &str) -> Option<Decimal> {
        (**self).custom_budget(username)
    }
}

/// No overrides at all
impl BudgetOverlay for () {
    fn custom_budget(&self, _username: &str) -> Option<Decimal> {
        None
    }
}
