//! Budget Ledger Library
//! # Overview
//!
//! This library keeps a per-user income/expense ledger in one CSV file and
//! derives monthly budget recommendations from each user's history.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, BudgetRecommendation, errors)
//! - [`io`] - Ledger record format, streaming readers and report export
//! - [`core`] - Business logic components:
//!   - [`core::transaction_store`] - Append-only ledger file with rollback
//!   - [`core::custom_budget_store`] - Per-user custom budget overlay
//!   - [`core::aggregator`] - Category totals and yearly summaries
//!   - [`core::engine`] - Budget recommendation heuristics
//!   - [`core::ledger`] - Facade with history cache
//! - [`config`] - Ledger and engine configuration
//! - [`cli`] - CLI arguments parsing
//!
//! # Budget Modes
//!
//! The engine picks one of four modes for the month of a reference date:
//!
//! - **Custom**: The user set an explicit monthly budget
//! - **Economical (unstable)**: At least three large expenses last month
//! - **Economical (festival)**: Next month is a promotional festival month
//! - **Normal**: Budget follows the user's average consumption ratio
//!
//! # Ledger Format
//!
//! ```text
//! user,operation,amount,time,merchant,type,remark,category,payment_method,location,tag,attachment,recurrence
//! alice,Income,5000.00,2024/06/01 09:00,u,Salary,u,u,u,u,u,u,u
//! ```
//!
//! Absent optional fields are written as `u` and shown as `Unclassified`.

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod types;

pub use config::{EngineConfig, LedgerConfig};
pub use core::{BudgetRecommendationEngine, CustomBudgetStore, Ledger, LedgerWriter, TransactionStore};
pub use io::write_transaction_summary;
pub use types::{
    BudgetMode, BudgetOverview, BudgetRecommendation, LargeExpense, LedgerError, Operation, Transaction,
    TransactionBuilder,
};
