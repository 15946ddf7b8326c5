//! Asynchronous ledger reader with batch interface
//!
//! Provides a streaming interface over ledger records for async callers.
//! Supports batch reading so a history scan never holds the whole file.
//!
//! # Architecture
//!
//! ```text
//! AsyncRead → csv-async AsyncReader → AsyncLedgerReader → Batches of Transactions
//!                                            ↓
//!                                   record_codec module
//!                                   (decode_fields)
//! ```

use crate::io::record_codec::decode_fields;
use crate::types::Transaction;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous ledger reader
///
/// Provides batch reading interface over ledger records. Records that fail
/// to decode are logged and counted, never yielded.
pub struct AsyncLedgerReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncReader<R>,
    skipped: usize,
    aborted: bool,
}

impl<R: AsyncRead + Unpin + Send> AsyncLedgerReader<R> {
    /// Create a new AsyncLedgerReader from an async reader
    ///
    /// # Arguments
    ///
    /// * `reader` - Async reader positioned at the ledger header
    ///
    /// # Returns
    ///
    /// A new AsyncLedgerReader instance
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .create_reader(reader);

        Self {
            csv_reader,
            skipped: 0,
            aborted: false,
        }
    }

    /// Read a batch of ledger records
    ///
    /// Reads up to `batch_size` decodable records. Invalid records are logged
    /// with their line number and skipped. A failed read of the underlying
    /// source ends the stream: this and every later batch stop there.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of records to return
    ///
    /// # Returns
    ///
    /// A vector of decoded transactions.
    /// Returns an empty vector when the end of the file is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Transaction> {
        let mut batch = Vec::with_capacity(batch_size);
        if self.aborted {
            return batch;
        }
        let mut records = self.csv_reader.records();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => {
                    let line = record.position().map(|pos| pos.line());
                    let fields: Vec<&str> = record.iter().collect();
                    match decode_fields(&fields, line) {
                        Ok(transaction) => batch.push(transaction),
                        Err(e) => {
                            self.skipped += 1;
                            tracing::warn!(error = %e, "Skipping ledger record");
                        }
                    }
                }
                Some(Err(e)) if matches!(e.kind(), csv_async::ErrorKind::Io(_)) => {
                    tracing::error!(error = %e, "Ledger read failed, stopping scan");
                    self.aborted = true;
                    break;
                }
                Some(Err(e)) => {
                    self.skipped += 1;
                    tracing::warn!(error = %e, "Skipping unreadable ledger record");
                }
                None => break,
            }
        }

        batch
    }

    /// Number of records skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether the scan stopped early on an I/O error
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}
