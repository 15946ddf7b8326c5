//! Core business logic module
//!
//! This module contains the ledger and budgeting components:
//! - `traits` - Seams for history sources, budget overlays and clocks
//! - `transaction_store` - Append-only ledger file
//! - `custom_budget_store` - Per-user custom budget overlay file
//! - `aggregator` - Category totals and yearly summaries
//! - `engine` - Budget recommendation heuristics
//! - `cache` - TTL cache of user histories
//! - `ledger` - Facade tying the above together
//! - `async` - Single-writer queue and async history scan

pub mod aggregator;
pub mod r#async;
pub mod atomic_file;
pub mod cache;
pub mod calendar;
pub mod custom_budget_store;
pub mod engine;
pub mod ledger;
pub mod traits;
pub mod transaction_store;

pub use cache::{ManualClock, SystemClock, TransactionCache};
pub use custom_budget_store::CustomBudgetStore;
pub use engine::BudgetRecommendationEngine;
pub use ledger::Ledger;
pub use r#async::{scan_history, LedgerWriter};
pub use traits::{BudgetOverlay, Clock, TransactionSource};
pub use transaction_store::{ImportReport, TransactionStore};
