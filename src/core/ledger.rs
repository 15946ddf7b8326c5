//! Ledger facade
//!
//! The single entry point UI and report collaborators use. It owns the ledger
//! file, the custom budget overlay and the history cache, and keeps the three
//! consistent: every successful write invalidates the affected cache entries
//! before returning.
//!
//! ```no_run
//! use budget_ledger::config::LedgerConfig;
//! use budget_ledger::core::Ledger;
//! use budget_ledger::types::{Operation, Transaction};
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let ledger = Ledger::open(LedgerConfig::default()).unwrap();
//! let salary = Transaction::builder("alice", Operation::Income, Decimal::new(5000, 0), "2024/06/10 09:00")
//!     .build()
//!     .unwrap();
//! ledger.add_transaction(&salary).unwrap();
//!
//! let rec = ledger.recommend("alice", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
//! println!("{}", rec);
//! ```

use crate::config::LedgerConfig;
use crate::core::r#async::{scan_history, LedgerWriter};
use crate::core::aggregator::{self, AnnualSummary, FinancialSummary, SpendingProfile};
use crate::core::cache::{SystemClock, TransactionCache};
use crate::core::custom_budget_store::CustomBudgetStore;
use crate::core::engine::BudgetRecommendationEngine;
use crate::core::traits::{Clock, TransactionSource};
use crate::core::transaction_store::{ImportReport, TransactionStore};
use crate::io::export::write_transaction_summary;
use crate::types::{BudgetOverview, BudgetRecommendation, LedgerError, Operation, Transaction};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Transaction ledger with budget recommendations
#[derive(Debug)]
pub struct Ledger<C: Clock = SystemClock> {
    store: TransactionStore,
    budgets: CustomBudgetStore,
    cache: Arc<TransactionCache<C>>,
    config: LedgerConfig,
}

impl Ledger<SystemClock> {
    /// Open the ledger and overlay named in `config`
    ///
    /// Creates the ledger file with its header if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if either file cannot be created or read.
    pub fn open(config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::open_with_clock(config, SystemClock)
    }
}

impl<C: Clock> Ledger<C> {
    /// Open the ledger with an injected cache clock
    pub fn open_with_clock(config: LedgerConfig, clock: C) -> Result<Self, LedgerError> {
        let store = TransactionStore::new(&config.ledger_path);
        store.ensure_exists()?;
        let budgets = CustomBudgetStore::open(&config.budget_path)?;
        let cache = Arc::new(TransactionCache::with_clock(config.cache_ttl, clock));

        tracing::info!(
            ledger = %config.ledger_path.display(),
            budgets = %config.budget_path.display(),
            "Opened ledger"
        );
        Ok(Ledger {
            store,
            budgets,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The underlying ledger file store
    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Record a transaction
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - The record was rejected; nothing was written
    /// * `LedgerError::Io` - The append failed
    pub fn add_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        self.store.append(transaction)?;
        self.cache.invalidate(&transaction.username);
        tracing::info!(
            username = %transaction.username,
            operation = %transaction.operation,
            amount = %transaction.amount,
            "Recorded transaction"
        );
        Ok(())
    }

    /// Roll back the first record of `username` at `timestamp`
    ///
    /// # Returns
    ///
    /// Whether a record was removed
    pub fn remove_transaction(&self, username: &str, timestamp: NaiveDateTime) -> Result<bool, LedgerError> {
        let removed = self.store.remove(username, timestamp)?;
        if removed {
            self.cache.invalidate(username);
        }
        Ok(removed)
    }

    /// Drop every cached history
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Rebuild a user's history from the file without blocking the runtime
    ///
    /// Always reads the file; the cache is neither consulted nor filled.
    pub async fn scan_transactions(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        scan_history(self.store.path(), username, self.config.scan_batch_size).await
    }

    /// A user's full history in ledger order
    pub fn read_transactions(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.cached_history(username)?.as_ref().clone())
    }

    fn cached_history(&self, username: &str) -> Result<Arc<Vec<Transaction>>, LedgerError> {
        self.cache
            .get_or_load(username, || self.store.history(username))
    }

    fn engine(&self) -> BudgetRecommendationEngine<&Self, &CustomBudgetStore> {
        BudgetRecommendationEngine::new(self, &self.budgets, self.config.engine.clone())
    }

    /// Budget recommendation for the month of `reference`; never fails
    pub fn recommend(&self, username: &str, reference: NaiveDate) -> BudgetRecommendation {
        self.engine().recommend(username, reference)
    }

    /// Budget panel figures for the month of `reference`; never fails
    pub fn overview(&self, username: &str, reference: NaiveDate) -> BudgetOverview {
        self.engine().overview(username, reference)
    }

    /// Average daily expense over the `months` full months before `reference`
    pub fn average_daily_expense(&self, username: &str, reference: NaiveDate, months: u32) -> Decimal {
        self.engine().average_daily_expense(username, reference, months)
    }

    pub fn get_custom_budget(&self, username: &str) -> Option<Decimal> {
        self.budgets.get(username)
    }

    /// Set the user's custom monthly budget
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Blank username or negative amount
    /// * `LedgerError::Io` - The overlay could not be rewritten
    pub fn save_custom_budget(&mut self, username: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.budgets.set(username, amount)
    }

    /// Remove the user's custom monthly budget
    pub fn clear_custom_budget(&mut self, username: &str) -> Result<bool, LedgerError> {
        self.budgets.clear(username)
    }

    /// Totals per category of `transactions` for one operation
    pub fn category_totals(&self, transactions: &[Transaction], operation: Operation) -> BTreeMap<String, Decimal> {
        aggregator::category_totals(transactions, operation)
    }

    /// Append every valid record of another ledger file
    pub fn import_transactions(&self, source: &Path) -> Result<ImportReport, LedgerError> {
        let report = self.store.import_from(source)?;
        self.cache.clear();
        Ok(report)
    }

    pub fn annual_summary(&self, username: &str, year: i32) -> Result<AnnualSummary, LedgerError> {
        Ok(aggregator::annual_summary(&self.cached_history(username)?, year))
    }

    pub fn financial_summary(&self, username: &str, year: i32) -> Result<FinancialSummary, LedgerError> {
        Ok(aggregator::financial_summary(&self.cached_history(username)?, year))
    }

    pub fn spending_profile(&self, username: &str, year: i32) -> Result<SpendingProfile, LedgerError> {
        Ok(aggregator::spending_profile(&self.cached_history(username)?, year))
    }

    /// Write the user's history in the five-column summary format
    pub fn export_summary(&self, username: &str, output: &mut dyn Write) -> Result<(), LedgerError> {
        write_transaction_summary(&self.cached_history(username)?, output)
    }
}

impl<C: Clock + Send + Sync + 'static> Ledger<C> {
    /// Start a single-writer queue over this ledger's file
    ///
    /// The worker drops the affected user's cached history after each applied
    /// write and before answering, so facade reads observe queued writes.
    pub fn spawn_writer(&self) -> Result<LedgerWriter, LedgerError> {
        let cache = Arc::clone(&self.cache);
        LedgerWriter::spawn_with_hook(
            self.store.clone(),
            self.config.writer_queue_capacity,
            Box::new(move |username| cache.invalidate(username)),
        )
    }
}

impl<C: Clock> TransactionSource for Ledger<C> {
    fn history(&self, username: &str) -> Result<Vec<Transaction>, LedgerError> {
        self.read_transactions(username)
    }
}
