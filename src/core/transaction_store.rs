//! Append-only ledger file shared by all users
//!
//! This module provides the TransactionStore component that persists every
//! transaction in one CSV file with a fixed header, and reconstructs a user's
//! history by streaming that file.
//!
//! # Durability
//!
//! - `append` writes one encoded line with a single `write_all`, then flushes
//!   and syncs, so a subsequent scan in the same process observes the record.
//! - `remove` is the only in-place mutation; it rewrites the whole file through
//!   a temporary sibling and an atomic rename.
//!
//! # Resilience
//!
//! A missing ledger reads as an empty one. Records that fail to decode are
//! logged with their line number, counted and skipped; they never abort a scan.

use crate::core::atomic_file::{ensure_parent, write_atomic};
use crate::core::traits::TransactionSource;
use crate::io::ledger_reader::LedgerReader;
use crate::io::record_codec::{decode_fields, encode, is_ledger_header, LEDGER_HEADER};
use crate::types::{user_key, LedgerError, Transaction};
use chrono::NaiveDateTime;
use csv::{ByteRecord, QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportReport {
    /// Records appended to the ledger
    pub imported: usize,

    /// Records that failed to decode and were left out
    pub skipped: usize,
}

/// File-backed transaction ledger
#[derive(Debug, Clone)]
pub struct TransactionStore {
    path: PathBuf,
}

impl TransactionStore {
    /// Create a store over the ledger at `path`
    ///
    /// No file is touched until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TransactionStore { path: path.into() }
    }

    /// Location of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the ledger with its header if it is absent
    ///
    /// An existing empty file receives the header. An existing file whose first
    /// line is not the canonical header is left alone and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file cannot be created or read.
    pub fn ensure_exists(&self) -> Result<(), LedgerError> {
        if !self.path.exists() {
            ensure_parent(&self.path)?;
            let mut file = File::create(&self.path)?;
            writeln!(file, "{}", LEDGER_HEADER)?;
            file.sync_data()?;
            tracing::info!(path = %self.path.display(), "Created ledger file");
            return Ok(());
        }

        let mut first_line = String::new();
        BufReader::new(File::open(&self.path)?).read_line(&mut first_line)?;

        if first_line.trim().is_empty() && fs::metadata(&self.path)?.len() == 0 {
            let mut file = OpenOptions::new().append(true).open(&self.path)?;
            writeln!(file, "{}", LEDGER_HEADER)?;
            file.sync_data()?;
            tracing::info!(path = %self.path.display(), "Wrote header to empty ledger file");
        } else if !is_ledger_header(&first_line) {
            tracing::warn!(
                path = %self.path.display(),
                expected = LEDGER_HEADER,
                found = first_line.trim_end(),
                "Ledger header mismatch"
            );
        }

        Ok(())
    }

    /// Append one record to the ledger
    ///
    /// # Arguments
    ///
    /// * `transaction` - The record to persist
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record is durable and visible to subsequent scans
    /// * `Err(LedgerError::Validation)` - The record was rejected before any I/O
    /// * `Err(LedgerError::Io)` - The write failed
    pub fn append(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        self.append_all(std::slice::from_ref(transaction))
    }

    /// Append several records with a single write
    ///
    /// Every record is validated and encoded before the file is opened, so a
    /// rejected record leaves the ledger untouched.
    pub fn append_all(&self, transactions: &[Transaction]) -> Result<(), LedgerError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for tx in transactions {
            tx.validate()?;
            buffer.push_str(&encode(tx)?);
            buffer.push('\n');
        }

        self.ensure_exists()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)?;

        // A torn final line must not swallow the new record
        if !ends_with_newline(&mut file)? {
            buffer.insert(0, '\n');
        }

        file.write_all(buffer.as_bytes())?;
        file.flush()?;
        file.sync_data()?;

        tracing::debug!(
            path = %self.path.display(),
            records = transactions.len(),
            "Appended ledger records"
        );
        Ok(())
    }

    /// Stream every decodable record in the ledger
    ///
    /// # Errors
    ///
    /// A missing ledger is an empty scan, not an error. Any other failure to
    /// open the file is returned as `LedgerError::Io`.
    pub fn scan_all(&self) -> Result<LedgerScan, LedgerError> {
        self.open_scan(None)
    }

    /// Stream the records of one user
    ///
    /// Usernames are matched case-insensitively after trimming.
    pub fn scan_by_user(&self, username: &str) -> Result<LedgerScan, LedgerError> {
        self.open_scan(Some(user_key(username)))
    }

    fn open_scan(&self, filter: Option<String>) -> Result<LedgerScan, LedgerError> {
        let reader = match LedgerReader::open(&self.path) {
            Ok(reader) => Some(reader),
            Err(LedgerError::FileNotFound { .. }) => {
                tracing::debug!(path = %self.path.display(), "Ledger file not found, treating as empty");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(LedgerScan {
            reader,
            filter,
            path: self.path.clone(),
            skipped: 0,
        })
    }

    /// Remove the first record of `username` at `timestamp`
    ///
    /// Used to roll back a just-appended record when a dependent write fails.
    /// Only decodable records match; the remaining lines, including ones that
    /// do not decode, are kept.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A record was removed and the file rewritten
    /// * `Ok(false)` - No record matched; the file was not touched
    /// * `Err(LedgerError::Io)` - The rewrite failed; the original file is intact
    pub fn remove(&self, username: &str, timestamp: NaiveDateTime) -> Result<bool, LedgerError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let key = user_key(username);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut kept: Vec<ByteRecord> = Vec::new();
        let mut removed = false;
        let mut record = ByteRecord::new();
        let mut is_header = true;

        while reader.read_byte_record(&mut record)? {
            if is_header {
                is_header = false;
                kept.push(record.clone());
                continue;
            }
            if !removed && record_matches(&record, &key, timestamp) {
                removed = true;
                continue;
            }
            kept.push(record.clone());
        }

        if !removed {
            return Ok(false);
        }

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());
        for record in &kept {
            writer.write_byte_record(record)?;
        }
        let data = writer.into_inner().map_err(|e| LedgerError::Io {
            message: e.to_string(),
        })?;

        write_atomic(&self.path, &data)?;
        tracing::info!(
            path = %self.path.display(),
            username,
            timestamp = %timestamp.format("%Y/%m/%d %H:%M"),
            "Removed ledger record"
        );
        Ok(true)
    }

    /// Append every decodable record of another ledger file
    ///
    /// The source must start with the canonical header (compared
    /// case-insensitively). Records that fail to decode are logged and skipped;
    /// the valid ones are appended in a single write.
    ///
    /// # Errors
    ///
    /// * `LedgerError::FileNotFound` - The source does not exist
    /// * `LedgerError::InvalidHeader` - The source's first line is not the ledger header
    /// * `LedgerError::Io` - Reading the source or writing the ledger failed
    pub fn import_from(&self, source: &Path) -> Result<ImportReport, LedgerError> {
        let mut reader = LedgerReader::open(source)?;
        if !reader.has_canonical_header()? {
            let found = reader.header_line()?;
            return Err(LedgerError::invalid_header(LEDGER_HEADER, &found));
        }

        let mut report = ImportReport::default();
        let mut accepted = Vec::new();
        for result in reader {
            match result {
                Ok(tx) => accepted.push(tx),
                Err(e) if e.is_recoverable() => {
                    report.skipped += 1;
                    tracing::warn!(source = %source.display(), error = %e, "Skipping import record");
                }
                Err(e) => return Err(e),
            }
        }

        self.append_all(&accepted)?;
        report.imported = accepted.len();

        tracing::info!(
            source = %source.display(),
            imported = report.imported,
            skipped = report.skipped,
            "Imported ledger records"
        );
        Ok(report)
    }
}

impl TransactionSource for TransactionStore {
    fn history(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.scan_by_user(username)?.collect())
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool, LedgerError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Only rows that decode are candidates; corrupt lines are never removed
fn record_matches(record: &ByteRecord, key: &str, timestamp: NaiveDateTime) -> bool {
    let Ok(record) = StringRecord::from_byte_record(record.clone()) else {
        return false;
    };
    let fields: Vec<&str> = record.iter().collect();
    decode_fields(&fields, None).map_or(false, |tx| tx.belongs_to(key) && tx.timestamp == timestamp)
}

/// Iterator over the decodable records of a ledger
///
/// Yields only records that decode (and, for a per-user scan, belong to the
/// user). Undecodable records are logged and counted in [`LedgerScan::skipped`].
#[derive(Debug)]
pub struct LedgerScan {
    reader: Option<LedgerReader>,
    filter: Option<String>,
    path: PathBuf,
    skipped: usize,
}

impl LedgerScan {
    /// Number of records skipped so far because they failed to decode
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for LedgerScan {
    type Item = Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = match self.reader.as_mut()?.next() {
                Some(result) => result,
                None => {
                    self.reader = None;
                    if self.skipped > 0 {
                        tracing::info!(
                            path = %self.path.display(),
                            skipped = self.skipped,
                            "Ledger scan finished with skipped records"
                        );
                    }
                    return None;
                }
            };

            match result {
                Ok(tx) => {
                    if self.filter.as_ref().map_or(true, |key| tx.belongs_to(key)) {
                        return Some(tx);
                    }
                }
                Err(e) if e.is_recoverable() => {
                    self.skipped += 1;
                    tracing::warn!(path = %self.path.display(), error = %e, "Skipping ledger record");
                }
                Err(e) => {
                    tracing::error!(path = %self.path.display(), error = %e, "Ledger scan aborted");
                    self.reader = None;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::{parse_timestamp, MAX_AMOUNT};
    use crate::types::Operation;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::{tempdir, TempDir};

    fn store_in(dir: &TempDir) -> TransactionStore {
        TransactionStore::new(dir.path().join("transactions.csv"))
    }

    fn tx(user: &str, op: Operation, amount: i64, time: &str) -> Transaction {
        Transaction::builder(user, op, Decimal::new(amount, 2), time)
            .build()
            .unwrap()
    }

    fn at(time: &str) -> NaiveDateTime {
        parse_timestamp(time).unwrap()
    }

    #[test]
    fn test_ensure_exists_creates_header() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.ensure_exists().unwrap();
        store.ensure_exists().unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, format!("{}\n", LEDGER_HEADER));
    }

    #[test]
    fn test_ensure_exists_fills_empty_file_and_tolerates_foreign_header() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "").unwrap();
        store.ensure_exists().unwrap();
        assert!(fs::read_to_string(store.path()).unwrap().starts_with(LEDGER_HEADER));

        fs::write(store.path(), "name,amount\n").unwrap();
        assert!(store.ensure_exists().is_ok());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "name,amount\n");
    }

    #[test]
    fn test_append_then_scan_by_user() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let income = Transaction::builder("Alice", Operation::Income, Decimal::new(500000, 2), "2024/06/10 09:00")
            .remark("bonus, \"Q2\"")
            .build()
            .unwrap();

        store.append(&income).unwrap();
        store.append(&tx("bob", Operation::Expense, 1000, "2024/06/11 10:00")).unwrap();

        let alice: Vec<_> = store.scan_by_user("alice").unwrap().collect();
        assert_eq!(alice, vec![income]);
        assert_eq!(store.scan_all().unwrap().count(), 2);
    }

    #[test]
    fn test_append_rejects_invalid_record_without_io() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let mut bad = tx("alice", Operation::Income, 100, "2024/06/10 09:00");
        bad.amount = Decimal::new(-1, 0);

        let result = store.append(&bad);

        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_append_repairs_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!("{}\nalice,Income,1.00,2024/06/01 09:00,u", LEDGER_HEADER),
        )
        .unwrap();

        store.append(&tx("alice", Operation::Income, 200, "2024/06/02 09:00")).unwrap();

        assert_eq!(store.scan_by_user("alice").unwrap().count(), 2);
    }

    #[test]
    fn test_scan_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.scan_all().unwrap().count(), 0);
        assert!(store.history("alice").unwrap().is_empty());
    }

    #[test]
    fn test_scan_skips_and_counts_corrupt_lines() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!(
                "{}\n\
                 alice,Income,100.00,2024/06/01 09:00,u\n\
                 alice,Income,NaN?,2024/06/01 09:00,u\n\
                 alice,Expense,5.00,2024-06-01 09:00:00,u\n\
                 alice\n\
                 alice,Expense,5.00,2024/06/02 09:00,u\n",
                LEDGER_HEADER
            ),
        )
        .unwrap();

        let mut scan = store.scan_all().unwrap();
        let records: Vec<_> = scan.by_ref().collect();

        assert_eq!(records.len(), 2);
        assert_eq!(scan.skipped(), 3);
    }

    #[test]
    fn test_remove_first_match_only() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let a = tx("alice", Operation::Expense, 100, "2024/06/10 09:00");
        let b = tx("alice", Operation::Expense, 200, "2024/06/10 09:00");
        let c = tx("bob", Operation::Expense, 300, "2024/06/10 09:00");
        store.append_all(&[a, b.clone(), c.clone()]).unwrap();

        assert!(store.remove("ALICE", at("2024/06/10 09:00")).unwrap());

        let remaining: Vec<_> = store.scan_all().unwrap().collect();
        assert_eq!(remaining, vec![b, c]);
        assert!(!crate::core::atomic_file::tmp_path(store.path()).exists());
    }

    #[test]
    fn test_remove_without_match_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!("{}\nalice,Income,oops,2024/06/01 09:00,u\n", LEDGER_HEADER),
        )
        .unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(!store.remove("alice", at("2024/06/01 09:00")).unwrap());
        assert!(!store.remove("carol", at("2024/06/01 09:00")).unwrap());

        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!TransactionStore::new(dir.path().join("none.csv"))
            .remove("alice", at("2024/06/01 09:00"))
            .unwrap());
    }

    #[test]
    fn test_remove_keeps_corrupt_lines() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!(
                "{}\nalice,Income,oops,2024/06/01 08:00,u\nalice,Income,1.00,2024/06/01 09:00,u\n",
                LEDGER_HEADER
            ),
        )
        .unwrap();

        assert!(store.remove("alice", at("2024/06/01 09:00")).unwrap());

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("alice,Income,oops,2024/06/01 08:00,u"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_remove_skips_corrupt_line_at_same_minute() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!("{}\nalice,Income,oops,2024/06/01 09:00,u\n", LEDGER_HEADER),
        )
        .unwrap();
        store.append(&tx("alice", Operation::Income, 100, "2024/06/01 09:00")).unwrap();

        assert!(store.remove("alice", at("2024/06/01 09:00")).unwrap());

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("alice,Income,oops,2024/06/01 09:00,u"));
        assert_eq!(store.scan_by_user("alice").unwrap().count(), 0);
        assert!(!store.remove("alice", at("2024/06/01 09:00")).unwrap());
    }

    #[test]
    fn test_amounts_beyond_max_are_rejected_and_skipped() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.append(&tx("alice", Operation::Income, 100, "2024/06/01 09:00")).unwrap();
        let before = fs::read(store.path()).unwrap();

        let mut huge = tx("alice", Operation::Income, 100, "2024/06/02 09:00");
        huge.amount = Decimal::MAX;
        assert!(matches!(store.append(&huge), Err(LedgerError::Validation { .. })));
        assert_eq!(fs::read(store.path()).unwrap(), before);

        let mut at_max = tx("alice", Operation::Income, 100, "2024/06/03 09:00");
        at_max.amount = MAX_AMOUNT;
        store.append(&at_max).unwrap();

        let mut content = fs::read_to_string(store.path()).unwrap();
        content.push_str("alice,Income,79228162514264337593543950335,2024/06/04 09:00,u\n");
        fs::write(store.path(), content).unwrap();

        let mut scan = store.scan_by_user("alice").unwrap();
        let amounts: Vec<_> = scan.by_ref().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![Decimal::new(100, 2), MAX_AMOUNT]);
        assert_eq!(scan.skipped(), 1);
    }

    #[test]
    fn test_failed_append_leaves_existing_ledger_intact() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.append(&tx("alice", Operation::Income, 100, "2024/06/01 09:00")).unwrap();
        let before = fs::read(store.path()).unwrap();

        let mut permissions = fs::metadata(store.path()).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(store.path(), permissions).unwrap();

        // Privileged users write through read-only bits
        if OpenOptions::new().append(true).open(store.path()).is_ok() {
            return;
        }

        let result = store.append(&tx("alice", Operation::Income, 200, "2024/06/02 09:00"));

        assert!(matches!(result, Err(LedgerError::Io { .. })));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_append_to_unwritable_location_fails_without_side_effects() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "keep me").unwrap();
        let store = TransactionStore::new(blocker.join("transactions.csv"));

        let result = store.append(&tx("alice", Operation::Income, 100, "2024/06/01 09:00"));

        assert!(matches!(result, Err(LedgerError::Io { .. })));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "keep me");
    }

    #[test]
    fn test_import_from_appends_valid_records() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let source = dir.path().join("import.csv");
        fs::write(
            &source,
            format!(
                "{}\nalice,Deposit,10.00,2024/06/01,u\nalice,Income,bad,2024/06/01,u\nbob,Expense,2.00,2024/06/02 10:00,Shop\n",
                LEDGER_HEADER.to_uppercase()
            ),
        )
        .unwrap();

        let report = store.import_from(&source).unwrap();

        assert_eq!(report, ImportReport { imported: 2, skipped: 1 });
        let all: Vec<_> = store.scan_all().unwrap().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].operation, Operation::Income);
        assert_eq!(all[0].date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_import_from_rejects_bad_header_and_missing_file() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let source = dir.path().join("import.csv");
        fs::write(&source, "who,what\nalice,Income,1.00,2024/06/01,u\n").unwrap();

        assert!(matches!(
            store.import_from(&source),
            Err(LedgerError::InvalidHeader { .. })
        ));
        assert!(matches!(
            store.import_from(&dir.path().join("missing.csv")),
            Err(LedgerError::FileNotFound { .. })
        ));
        assert!(!store.path().exists());
    }
}
