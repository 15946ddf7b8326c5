//! Asynchronous ledger access
//!
//! - **LedgerWriter**: one worker thread owns the ledger file and applies
//!   queued mutations in order, with a bounded queue and back-pressure
//! - **scan_history**: batch-wise async history reconstruction
//!
//! # Thread Safety
//!
//! `LedgerWriter` handles are `Clone + Send + Sync`; any number of tasks may
//! submit writes concurrently while the file sees exactly one writer.

pub mod scanner;
pub mod writer;

pub use scanner::scan_history;
pub use writer::{CommitHook, LedgerWriter, PendingWrite};
