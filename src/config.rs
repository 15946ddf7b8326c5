//! Ledger and engine configuration
//!
//! `EngineConfig` holds the recommendation heuristics; `LedgerConfig` holds the
//! file locations and runtime limits of a `Ledger`. Both default to the values
//! the budget advisor has always used. Zero-sized limits fall back to their
//! defaults with a warning instead of failing.

use chrono::Month;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Default ledger file name
pub const DEFAULT_LEDGER_PATH: &str = "transactions.csv";

/// Default custom budget overlay file name
pub const DEFAULT_BUDGET_PATH: &str = "user_budget.csv";

/// Recommendation heuristics
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// An expense above this amount counts as large for the instability check
    pub large_expense_threshold: Decimal,

    /// Large expenses in the previous month that make spending unstable
    pub unstable_expense_count: usize,

    /// Prior months examined for the consumption ratio
    pub learning_months: u32,

    /// Share of income saved in Normal mode without usable history
    pub default_saving_ratio: Decimal,

    /// Extra share of income saved in the economical modes
    pub economical_saving_increase: Decimal,

    /// Consumption ratios above this are treated as pathological
    pub max_consumption_ratio: Decimal,

    /// Months with heavier promotional spending
    pub festival_months: Vec<Month>,

    /// Share of monthly income above which an expense is listed as large
    pub large_consumption_ratio: Decimal,

    /// Lower bound of the large-expense listing threshold
    pub large_consumption_floor: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_expense_threshold: Decimal::new(1000, 0),
            unstable_expense_count: 3,
            learning_months: 3,
            default_saving_ratio: Decimal::new(2, 1),
            economical_saving_increase: Decimal::new(1, 1),
            max_consumption_ratio: Decimal::new(15, 1),
            festival_months: vec![Month::March, Month::June, Month::November, Month::December],
            large_consumption_ratio: Decimal::new(7, 2),
            large_consumption_floor: Decimal::new(100, 0),
        }
    }
}

impl EngineConfig {
    /// Replace the festival calendar
    pub fn with_festival_months(mut self, months: impl IntoIterator<Item = Month>) -> Self {
        self.festival_months = months.into_iter().collect();
        self
    }

    /// Consumption ratio used when history is missing or out of bounds (0.8)
    pub fn default_consumption_ratio(&self) -> Decimal {
        Decimal::ONE - self.default_saving_ratio
    }

    /// Consumption ratio of the economical modes (0.7)
    pub fn economical_consumption_ratio(&self) -> Decimal {
        Decimal::ONE - (self.default_saving_ratio + self.economical_saving_increase)
    }

    /// Whether `month` (1-12) is a festival month
    pub fn is_festival_month(&self, month: u32) -> bool {
        self.festival_months
            .iter()
            .any(|festival| festival.number_from_month() == month)
    }
}

/// Configuration of a `Ledger`
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Ledger file
    pub ledger_path: PathBuf,

    /// Custom budget overlay file
    pub budget_path: PathBuf,

    /// How long a cached history stays fresh
    pub cache_ttl: Duration,

    /// Commands the writer thread buffers before callers wait
    pub writer_queue_capacity: usize,

    /// Records per batch in asynchronous history scans
    pub scan_batch_size: usize,

    pub engine: EngineConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            budget_path: PathBuf::from(DEFAULT_BUDGET_PATH),
            cache_ttl: Duration::from_secs(5 * 60),
            writer_queue_capacity: 64,
            scan_batch_size: 1000,
            engine: EngineConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Configuration with custom file locations and default limits
    pub fn new(ledger_path: impl Into<PathBuf>, budget_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            budget_path: budget_path.into(),
            ..Self::default()
        }
    }

    /// Set the cache TTL; zero falls back to the default
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = if ttl.is_zero() {
            let default = Self::default().cache_ttl;
            tracing::warn!(?default, "Invalid cache_ttl (0), using default");
            default
        } else {
            ttl
        };
        self
    }

    /// Set the writer queue capacity; zero falls back to the default
    pub fn with_writer_queue_capacity(mut self, capacity: usize) -> Self {
        self.writer_queue_capacity = if capacity == 0 {
            let default = Self::default().writer_queue_capacity;
            tracing::warn!(default, "Invalid writer_queue_capacity (0), using default");
            default
        } else {
            capacity
        };
        self
    }

    /// Set the async scan batch size; zero falls back to the default
    pub fn with_scan_batch_size(mut self, batch_size: usize) -> Self {
        self.scan_batch_size = if batch_size == 0 {
            let default = Self::default().scan_batch_size;
            tracing::warn!(default, "Invalid scan_batch_size (0), using default");
            default
        } else {
            batch_size
        };
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_consumption_ratio(), Decimal::new(8, 1));
        assert_eq!(config.economical_consumption_ratio(), Decimal::new(7, 1));
        assert_eq!(config.unstable_expense_count, 3);
        assert_eq!(config.learning_months, 3);
    }

    #[rstest]
    #[case(3, true)]
    #[case(6, true)]
    #[case(7, false)]
    #[case(11, true)]
    #[case(12, true)]
    #[case(1, false)]
    fn test_default_festival_calendar(#[case] month: u32, #[case] expected: bool) {
        assert_eq!(EngineConfig::default().is_festival_month(month), expected);
    }

    #[test]
    fn test_festival_calendar_is_parameterisable() {
        let config = EngineConfig::default().with_festival_months([Month::July]);
        assert!(config.is_festival_month(7));
        assert!(!config.is_festival_month(11));
    }

    #[test]
    fn test_ledger_config_new_keeps_default_limits() {
        let config = LedgerConfig::new("a.csv", "b.csv");
        assert_eq!(config.ledger_path, PathBuf::from("a.csv"));
        assert_eq!(config.budget_path, PathBuf::from("b.csv"));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.writer_queue_capacity, 64);
    }

    #[rstest]
    #[case::zero_values(0, 0, Duration::ZERO, 64, 1000, Duration::from_secs(300))]
    #[case::custom_values(8, 50, Duration::from_secs(1), 8, 50, Duration::from_secs(1))]
    fn test_zero_values_fall_back_to_defaults(
        #[case] capacity: usize,
        #[case] batch: usize,
        #[case] ttl: Duration,
        #[case] expected_capacity: usize,
        #[case] expected_batch: usize,
        #[case] expected_ttl: Duration,
    ) {
        let config = LedgerConfig::default()
            .with_writer_queue_capacity(capacity)
            .with_scan_batch_size(batch)
            .with_cache_ttl(ttl);

        assert_eq!(config.writer_queue_capacity, expected_capacity);
        assert_eq!(config.scan_batch_size, expected_batch);
        assert_eq!(config.cache_ttl, expected_ttl);
    }
}
