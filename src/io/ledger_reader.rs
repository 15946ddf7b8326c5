//! Synchronous ledger reader with iterator interface
//!
//! Provides a streaming iterator over the records of a ledger file.
//! Delegates record format concerns to the record_codec module.
//!
//! # Design
//!
//! The LedgerReader uses csv::Reader to read records sequentially and
//! record_codec::decode_record to turn each one into a `Transaction`. Records
//! are processed one at a time without loading the entire file into memory.
//!
//! # Iterator Interface
//!
//! LedgerReader implements the Iterator trait, yielding
//! `Result<Transaction, LedgerError>` for each data row:
//!
//! ```no_run
//! use budget_ledger::io::ledger_reader::LedgerReader;
//! use std::path::Path;
//!
//! let reader = LedgerReader::open(Path::new("transactions.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(tx) => println!("{} {} {}", tx.username, tx.operation, tx.amount),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `open()`
//! - Individual record errors are yielded as Err variants in the iterator
//! - Errors carry the 1-based line number of the offending record

use crate::io::record_codec::{decode_record, is_ledger_header};
use crate::types::{LedgerError, Transaction};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Streaming reader over ledger records
#[derive(Debug)]
pub struct LedgerReader<R: Read = File> {
    reader: csv::Reader<R>,
    record: StringRecord,
    header_checked: bool,
}

impl LedgerReader<File> {
    /// Open a ledger file for streaming
    ///
    /// The first row is always treated as the header and never yielded.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ledger file
    ///
    /// # Returns
    ///
    /// * `Ok(LedgerReader)` if the file opened successfully
    /// * `Err(LedgerError::FileNotFound)` if the file does not exist
    /// * `Err(LedgerError::Io)` for any other open failure
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::file_not_found(path),
            _ => LedgerError::from(e),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> LedgerReader<R> {
    /// Wrap any reader positioned at the start of a ledger
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
            header_checked: false,
        }
    }

    /// Whether the first row is the canonical ledger header
    ///
    /// # Errors
    ///
    /// Returns an error if the header row cannot be read.
    pub fn has_canonical_header(&mut self) -> Result<bool, LedgerError> {
        let header = self.reader.headers()?;
        let line = header.iter().collect::<Vec<_>>().join(",");
        Ok(is_ledger_header(&line))
    }

    /// The header row as read from the file
    pub fn header_line(&mut self) -> Result<String, LedgerError> {
        Ok(self.reader.headers()?.iter().collect::<Vec<_>>().join(","))
    }
}

impl<R: Read> Iterator for LedgerReader<R> {
    type Item = Result<Transaction, LedgerError>;

    /// Get the next ledger record
    ///
    /// # Returns
    ///
    /// * `Some(Ok(Transaction))` - Successfully decoded record
    /// * `Some(Err(LedgerError))` - Parse error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        if !self.header_checked {
            self.header_checked = true;
            if let Ok(false) = self.has_canonical_header() {
                tracing::debug!("Ledger header is not canonical, reading records positionally");
            }
        }

        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {
                    // Blank lines carry no record
                    if self.record.len() == 1 && self.record[0].trim().is_empty() {
                        continue;
                    }
                    return Some(decode_record(&self.record));
                }
                Ok(false) => return None,
                // A torn UTF-8 sequence only affects its own record
                Err(e) => {
                    let line = self.reader.position().line();
                    return Some(Err(LedgerError::from(e).at_line(Some(line))));
                }
            }
        }
    }
}
