//! Budget recommendation engine
//!
//! This module provides the BudgetRecommendationEngine that derives a monthly
//! budget and saving suggestion from a user's own history.
//!
//! The engine applies, in order:
//! - Custom override: a user-defined budget bypasses history analysis
//! - Mode selection: unstable spending last month, then an upcoming festival
//!   month, otherwise normal
//! - Budget amount: 70% of the month's income in the economical modes, or the
//!   user's average consumption ratio over the learning months in normal mode
//!   (80% without usable history)
//! - Clamping: neither budget nor saving is ever negative
//!
//! `recommend` never fails. A history that cannot be loaded is treated as
//! empty and yields a zero recommendation.

use crate::config::EngineConfig;
use crate::core::aggregator::{kind_totals, month_total, top_entry};
use crate::core::calendar::{days_in_month, months_ahead, months_back, same_month};
use crate::core::traits::{BudgetOverlay, TransactionSource};
use crate::types::{
    BudgetMode, BudgetOverview, BudgetRecommendation, LargeExpense, Operation, Transaction,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Note appended to a custom recommendation when next month is a festival month
pub const FESTIVAL_NOTE: &str = "Next month includes a shopping festival.";

/// Budget recommendation engine
///
/// Generic over where history and overrides come from, so the same logic runs
/// over the ledger files, the cached facade, or in-memory fixtures.
#[derive(Debug, Clone)]
pub struct BudgetRecommendationEngine<S, O> {
    source: S,
    overlay: O,
    config: EngineConfig,
}

impl<S: TransactionSource, O: BudgetOverlay> BudgetRecommendationEngine<S, O> {
    /// Create an engine over a history source and an override overlay
    pub fn new(source: S, overlay: O, config: EngineConfig) -> Self {
        BudgetRecommendationEngine {
            source,
            overlay,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recommend a budget for `username` in the month of `reference`
    ///
    /// # Arguments
    ///
    /// * `username` - The user; blank yields the "User not specified" sentinel
    /// * `reference` - Any day of the month to plan for
    ///
    /// # Returns
    ///
    /// A recommendation; never an error
    pub fn recommend(&self, username: &str, reference: NaiveDate) -> BudgetRecommendation {
        if username.trim().is_empty() {
            return BudgetRecommendation::unspecified();
        }

        let history = self.load_history(username);
        let custom = self.overlay.custom_budget(username);
        self.recommend_from(&history, custom, reference)
    }

    /// Recommend a budget from an already-loaded history
    ///
    /// # Arguments
    ///
    /// * `history` - The user's transactions
    /// * `custom` - The user's custom budget, if any
    /// * `reference` - Any day of the month to plan for
    pub fn recommend_from(
        &self,
        history: &[Transaction],
        custom: Option<Decimal>,
        reference: NaiveDate,
    ) -> BudgetRecommendation {
        let income = month_total(history, Operation::Income, reference);

        if let Some(budget) = custom.filter(|budget| *budget >= Decimal::ZERO) {
            let saving = (income - budget).max(Decimal::ZERO);
            tracing::debug!(%budget, %income, "Custom budget overrides history");
            return BudgetRecommendation::new(BudgetMode::Custom, budget, saving, false, income);
        }

        let mode = self.determine_mode(history, reference);
        let has_past_data = self.has_past_data(history, reference);

        let ratio = if mode.is_economical() {
            self.config.economical_consumption_ratio()
        } else if has_past_data {
            self.bounded_ratio(self.average_consumption_ratio(history, reference))
        } else {
            self.config.default_consumption_ratio()
        };

        let budget = (income * ratio).max(Decimal::ZERO);
        let saving = (income - budget).max(Decimal::ZERO);

        tracing::debug!(
            mode = mode.display_name(),
            %ratio,
            %income,
            has_past_data,
            "Computed budget recommendation"
        );
        BudgetRecommendation::new(mode, budget, saving, has_past_data, income)
    }

    /// Everything the budget panel shows for `username` in the month of `reference`
    ///
    /// History is loaded once and shared by every figure.
    pub fn overview(&self, username: &str, reference: NaiveDate) -> BudgetOverview {
        if username.trim().is_empty() {
            return BudgetOverview {
                recommendation: BudgetRecommendation::unspecified(),
                month_income: Decimal::ZERO,
                month_expense: Decimal::ZERO,
                top_expense_type: None,
                large_expenses: Vec::new(),
                custom_budget: None,
            };
        }

        let history = self.load_history(username);
        let custom_budget = self.overlay.custom_budget(username);

        let mut recommendation = self.recommend_from(&history, custom_budget, reference);
        if recommendation.mode == BudgetMode::Custom && self.next_month_is_festival(reference) {
            recommendation = recommendation.with_note(FESTIVAL_NOTE);
        }

        let month_income = month_total(&history, Operation::Income, reference);
        let month_expense = month_total(&history, Operation::Expense, reference);

        let this_month: Vec<Transaction> = history
            .into_iter()
            .filter(|tx| same_month(tx.date(), reference))
            .collect();
        let top_expense_type =
            top_entry(&kind_totals(&this_month, Operation::Expense)).map(|(kind, _)| kind.to_string());

        BudgetOverview {
            recommendation,
            month_income,
            month_expense,
            top_expense_type,
            large_expenses: self.large_expenses(&this_month, month_income),
            custom_budget,
        }
    }

    /// Average daily expense over the `months` full months before `reference`
    ///
    /// # Returns
    ///
    /// Total expense divided by the number of days in those months; zero when
    /// `months` is 0 or there was no expense.
    pub fn average_daily_expense(&self, username: &str, reference: NaiveDate, months: u32) -> Decimal {
        if months == 0 || username.trim().is_empty() {
            return Decimal::ZERO;
        }

        let history = self.load_history(username);
        let mut total_expense = Decimal::ZERO;
        let mut total_days = 0u32;

        for i in 1..=months {
            let month = months_back(reference, i);
            total_expense += month_total(&history, Operation::Expense, month);
            total_days += days_in_month(month);
        }

        if total_days == 0 || total_expense <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        total_expense / Decimal::from(total_days)
    }

    fn load_history(&self, username: &str) -> Vec<Transaction> {
        match self.source.history(username) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(username, error = %e, "History unavailable, treating as empty");
                Vec::new()
            }
        }
    }

    fn determine_mode(&self, history: &[Transaction], reference: NaiveDate) -> BudgetMode {
        if self.has_unstable_spending_last_month(history, reference) {
            BudgetMode::EconomicalUnstable
        } else if self.next_month_is_festival(reference) {
            BudgetMode::EconomicalFestival
        } else {
            BudgetMode::Normal
        }
    }

    fn has_unstable_spending_last_month(&self, history: &[Transaction], reference: NaiveDate) -> bool {
        let last_month = months_back(reference, 1);
        let large = history
            .iter()
            .filter(|tx| {
                tx.is_expense()
                    && same_month(tx.date(), last_month)
                    && tx.amount > self.config.large_expense_threshold
            })
            .count();
        large >= self.config.unstable_expense_count
    }

    fn next_month_is_festival(&self, reference: NaiveDate) -> bool {
        self.config
            .is_festival_month(months_ahead(reference, 1).month())
    }

    /// Every learning month must have recorded income
    fn has_past_data(&self, history: &[Transaction], reference: NaiveDate) -> bool {
        self.config.learning_months > 0
            && (1..=self.config.learning_months).all(|i| {
                month_total(history, Operation::Income, months_back(reference, i)) > Decimal::ZERO
            })
    }

    /// Mean of expense/income over the learning months with income
    fn average_consumption_ratio(&self, history: &[Transaction], reference: NaiveDate) -> Decimal {
        let mut sum = Decimal::ZERO;
        let mut counted = 0u32;

        for i in 1..=self.config.learning_months {
            let month = months_back(reference, i);
            let income = month_total(history, Operation::Income, month);
            if income > Decimal::ZERO {
                sum += month_total(history, Operation::Expense, month) / income;
                counted += 1;
            }
        }

        if counted == 0 {
            return self.config.default_consumption_ratio();
        }
        sum / Decimal::from(counted)
    }

    fn bounded_ratio(&self, ratio: Decimal) -> Decimal {
        if ratio <= Decimal::ZERO || ratio > self.config.max_consumption_ratio {
            tracing::debug!(%ratio, "Consumption ratio out of bounds, using default");
            self.config.default_consumption_ratio()
        } else {
            ratio
        }
    }

    fn large_expenses(&self, month: &[Transaction], income: Decimal) -> Vec<LargeExpense> {
        let floor = self.config.large_consumption_floor;
        let threshold = if income > Decimal::ZERO {
            (income * self.config.large_consumption_ratio).max(floor)
        } else {
            floor
        };

        month
            .iter()
            .filter(|tx| tx.is_expense() && tx.amount > threshold)
            .map(|tx| LargeExpense {
                timestamp: tx.timestamp,
                amount: tx.amount,
                kind: tx.display_kind().to_string(),
            })
            .collect()
    }
}
