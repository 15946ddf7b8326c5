//! Budget recommendation types
//!
//! These values are derived on every request and never persisted.

use crate::types::transaction::format_timestamp;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Reason given when a recommendation is requested without a username
pub const USER_NOT_SPECIFIED: &str = "User not specified";

/// Budget-recommendation regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetMode {
    /// History-driven consumption ratio
    Normal,

    /// Several large expenses last month; save more
    EconomicalUnstable,

    /// Next month is a shopping-festival month; save more
    EconomicalFestival,

    /// The user's own budget overrides the analysis
    Custom,
}

impl BudgetMode {
    /// Short label for display
    pub fn display_name(&self) -> &'static str {
        match self {
            BudgetMode::Normal => "Normal Mode",
            BudgetMode::EconomicalUnstable | BudgetMode::EconomicalFestival => "Economical Mode",
            BudgetMode::Custom => "Custom Mode",
        }
    }

    /// Static explanation attached to recommendations in this mode
    pub fn reason(&self) -> &'static str {
        match self {
            BudgetMode::Normal => "Consumption is stable and predictable.",
            BudgetMode::EconomicalUnstable => "Recent spending patterns were unstable.",
            BudgetMode::EconomicalFestival => "Prepare for potential increased spending next month.",
            BudgetMode::Custom => "Following your defined budget goal.",
        }
    }

    pub fn is_economical(&self) -> bool {
        matches!(
            self,
            BudgetMode::EconomicalUnstable | BudgetMode::EconomicalFestival
        )
    }
}

impl fmt::Display for BudgetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Monthly budget and saving suggestion for one user
///
/// Amounts are kept at full precision; round at presentation time
/// (the `Display` impl prints 2 decimal places).
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRecommendation {
    pub mode: BudgetMode,

    /// Suggested spending for the reference month (never negative)
    pub suggested_budget: Decimal,

    /// Suggested saving for the reference month (never negative)
    pub suggested_saving: Decimal,

    /// Human-readable explanation
    pub reason: String,

    /// Whether each of the learning months had recorded income
    pub has_past_data: bool,

    /// Income of the reference month the suggestion is based on
    pub income: Decimal,
}

impl BudgetRecommendation {
    /// Build a recommendation carrying the mode's static reason
    pub fn new(
        mode: BudgetMode,
        suggested_budget: Decimal,
        suggested_saving: Decimal,
        has_past_data: bool,
        income: Decimal,
    ) -> Self {
        BudgetRecommendation {
            mode,
            suggested_budget,
            suggested_saving,
            reason: mode.reason().to_string(),
            has_past_data,
            income,
        }
    }

    /// Zero recommendation returned when no username was supplied
    pub fn unspecified() -> Self {
        BudgetRecommendation {
            mode: BudgetMode::Normal,
            suggested_budget: Decimal::ZERO,
            suggested_saving: Decimal::ZERO,
            reason: USER_NOT_SPECIFIED.to_string(),
            has_past_data: false,
            income: Decimal::ZERO,
        }
    }

    /// Append a contextual note to the reason
    pub fn with_note(mut self, note: &str) -> Self {
        if !note.trim().is_empty() {
            self.reason.push(' ');
            self.reason.push_str(note.trim());
        }
        self
    }
}

impl fmt::Display for BudgetRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: budget {:.2}, saving {:.2} ({})",
            self.mode, self.suggested_budget, self.suggested_saving, self.reason
        )
    }
}

/// An expense large relative to the month's income
#[derive(Debug, Clone, PartialEq)]
pub struct LargeExpense {
    pub timestamp: NaiveDateTime,
    pub amount: Decimal,
    pub kind: String,
}

impl fmt::Display for LargeExpense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {:.2} - {}",
            format_timestamp(&self.timestamp),
            self.amount,
            self.kind
        )
    }
}

/// Everything a budget panel shows for one user and month
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOverview {
    pub recommendation: BudgetRecommendation,
    pub month_income: Decimal,
    pub month_expense: Decimal,

    /// Expense type with the highest total this month
    pub top_expense_type: Option<String>,

    pub large_expenses: Vec<LargeExpense>,
    pub custom_budget: Option<Decimal>,
}
