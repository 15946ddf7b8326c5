//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `transaction`: Ledger records, operations, and field normalisation
//! - `budget`: Budget modes and derived recommendations
//! - `error`: Error types for the ledger

pub mod budget;
pub mod error;
pub mod transaction;

pub use budget::{BudgetMode, BudgetOverview, BudgetRecommendation, LargeExpense};
pub use error::LedgerError;
pub use transaction::{user_key, Operation, Transaction, TransactionBuilder};
