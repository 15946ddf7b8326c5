//! Custom monthly budget overlay
//!
//! A small keyed file mapping username to a user-defined monthly budget,
//! independent of the ledger. The whole file is loaded into memory on open and
//! rewritten atomically on every `set`/`clear`, so a `get` after a mutation in
//! the same process always observes it.
//!
//! # File format
//!
//! ```text
//! username,budget
//! alice,2500.00
//! ```
//!
//! The header is written on every rewrite; files without one are still read.
//! Rows that do not parse (wrong field count, bad or negative amount) are
//! logged and ignored.

use crate::core::atomic_file::write_atomic;
use crate::core::traits::BudgetOverlay;
use crate::types::transaction::round_money;
use crate::types::{user_key, LedgerError};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Header row of the overlay file
pub const BUDGET_HEADER: [&str; 2] = ["username", "budget"];

/// One overlay row as read from disk
#[derive(Debug, Deserialize)]
struct BudgetRow {
    username: String,
    budget: String,
}

#[derive(Debug, Clone, PartialEq)]
struct BudgetEntry {
    /// Username as the user last typed it
    username: String,
    amount: Decimal,
}

/// File-backed custom budget overlay
#[derive(Debug)]
pub struct CustomBudgetStore {
    path: PathBuf,

    /// Entries keyed by [`user_key`]
    entries: BTreeMap<String, BudgetEntry>,
}

impl CustomBudgetStore {
    /// Load the overlay at `path`
    ///
    /// A missing file is an empty overlay.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let entries = load_entries(&path)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded custom budgets");
        Ok(CustomBudgetStore { path, entries })
    }

    /// Location of the overlay file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The user's custom budget, if one is set
    pub fn get(&self, username: &str) -> Option<Decimal> {
        self.entries.get(&user_key(username)).map(|entry| entry.amount)
    }

    /// Number of users with a custom budget
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set or replace the user's custom budget
    ///
    /// The amount is rounded to 2 decimal places.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Blank username or negative amount; nothing is changed
    /// * `LedgerError::Io` - The rewrite failed; the in-memory state is rolled back
    pub fn set(&mut self, username: &str, amount: Decimal) -> Result<(), LedgerError> {
        if username.trim().is_empty() {
            return Err(LedgerError::validation("username", "must not be empty"));
        }
        if amount < Decimal::ZERO {
            return Err(LedgerError::validation(
                "budget",
                format!("{} must not be negative", amount),
            ));
        }

        let key = user_key(username);
        let entry = BudgetEntry {
            username: username.trim().to_string(),
            amount: round_money(amount),
        };
        let previous = self.entries.insert(key.clone(), entry);

        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => self.entries.insert(key, previous),
                None => self.entries.remove(&key),
            };
            return Err(e);
        }

        tracing::info!(username, budget = %round_money(amount), "Saved custom budget");
        Ok(())
    }

    /// Remove the user's custom budget
    ///
    /// Other users' rows are left as they are.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - An entry was removed and the file rewritten
    /// * `Ok(false)` - The user had no entry; the file was not touched
    /// * `Err(LedgerError::Io)` - The rewrite failed; the entry is kept
    pub fn clear(&mut self, username: &str) -> Result<bool, LedgerError> {
        let key = user_key(username);
        let Some(previous) = self.entries.remove(&key) else {
            return Ok(false);
        };

        if let Err(e) = self.persist() {
            self.entries.insert(key, previous);
            return Err(e);
        }

        tracing::info!(username, "Cleared custom budget");
        Ok(true)
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(BUDGET_HEADER)?;
        for entry in self.entries.values() {
            writer.write_record([entry.username.clone(), format!("{:.2}", entry.amount)])?;
        }
        let data = writer.into_inner().map_err(|e| LedgerError::Io {
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &data)
    }
}

impl BudgetOverlay for CustomBudgetStore {
    fn custom_budget(&self, username: &str) -> Option<Decimal> {
        self.get(username)
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, BudgetEntry>, LedgerError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Budget file not found, no custom budgets loaded");
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut entries = BTreeMap::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let error = LedgerError::from(e);
                if !error.is_recoverable() {
                    return Err(error);
                }
                tracing::warn!(path = %path.display(), error = %error, "Skipping budget line");
                continue;
            }
        }

        let line = record.position().map(|pos| pos.line());
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if is_header(&record) {
            continue;
        }

        match parse_row(&record, line) {
            Ok(entry) => {
                entries.insert(user_key(&entry.username), entry);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping budget line");
            }
        }
    }

    Ok(entries)
}

fn is_header(record: &StringRecord) -> bool {
    record.len() == 2
        && record[0].eq_ignore_ascii_case(BUDGET_HEADER[0])
        && record[1].eq_ignore_ascii_case(BUDGET_HEADER[1])
}

fn parse_row(record: &StringRecord, line: Option<u64>) -> Result<BudgetEntry, LedgerError> {
    if record.len() != 2 {
        return Err(LedgerError::parse(
            line,
            format!("expected 2 fields, found {}", record.len()),
        ));
    }

    let row: BudgetRow = record
        .deserialize(None)
        .map_err(|e| LedgerError::parse(line, e.to_string()))?;

    if row.username.is_empty() {
        return Err(LedgerError::parse(line, "empty username"));
    }

    let amount = Decimal::from_str(&row.budget)
        .map_err(|_| LedgerError::parse(line, format!("Invalid budget '{}'", row.budget)))?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::parse(
            line,
            format!("Negative budget '{}' for {}", row.budget, row.username),
        ));
    }

    Ok(BudgetEntry {
        username: row.username,
        amount: round_money(amount),
    })
}
