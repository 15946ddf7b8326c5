//! I/O module
//!
//! Handles the ledger file format, reading and report output.
//!
//! # Components
//!
//! - `record_codec` - Ledger record format (header, encode, decode)
//! - `ledger_reader` - Synchronous ledger reader with iterator interface
//! - `async_reader` - Asynchronous ledger reader with batch reading interface
//! - `export` - Transaction summary CSV for report collaborators

pub mod async_reader;
pub mod export;
pub mod ledger_reader;
pub mod record_codec;

pub use async_reader::AsyncLedgerReader;
pub use export::write_transaction_summary;
pub use ledger_reader::LedgerReader;
pub use record_codec::{decode, decode_fields, encode, parse_timestamp, LEDGER_HEADER};
