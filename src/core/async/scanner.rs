//! Asynchronous history scan
//!
//! Reads the ledger in batches through `AsyncLedgerReader`, so an async caller
//! can rebuild a user's history without blocking its runtime thread and
//! without holding more than one batch of undecoded records.

use crate::io::async_reader::AsyncLedgerReader;
use crate::types::{user_key, LedgerError, Transaction};
use std::io::ErrorKind;
use std::path::Path;
use tokio_util::compat::TokioAsyncReadCompatExt;

/// Collect every decodable record of `username` from the ledger at `path`
///
/// # Arguments
///
/// * `path` - Ledger file
/// * `username` - User whose records are kept (case-insensitive, trimmed)
/// * `batch_size` - Records decoded per batch; zero is treated as one
///
/// # Returns
///
/// The user's records in ledger order. A missing ledger yields an empty history.
///
/// # Errors
///
/// Returns `LedgerError::Io` if the ledger exists but cannot be opened.
pub async fn scan_history(path: &Path, username: &str, batch_size: usize) -> Result<Vec<Transaction>, LedgerError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Ledger absent, empty history");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let key = user_key(username);
    let batch_size = batch_size.max(1);
    let mut reader = AsyncLedgerReader::new(file.compat());
    let mut history = Vec::new();

    loop {
        let batch = reader.read_batch(batch_size).await;
        if batch.is_empty() {
            break;
        }
        history.extend(batch.into_iter().filter(|tx| tx.belongs_to(&key)));
    }

    if reader.is_aborted() {
        tracing::warn!(username = %key, records = history.len(), "Async history scan ended early");
    }
    tracing::debug!(
        username = %key,
        records = history.len(),
        skipped = reader.skipped(),
        "Async history scan finished"
    );
    Ok(history)
}
