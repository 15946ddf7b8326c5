//! Grouping and summing over transaction sets
//!
//! Feeds the chart and report collaborators. All sums are accumulated in
//! `Decimal` without intermediate rounding; callers round at presentation.
//!
//! Every function here is pure and takes an already-loaded slice, typically
//! one user's history.

use crate::core::calendar::same_month;
use crate::types::transaction::UNCLASSIFIED_LABEL;
use crate::types::{Operation, Transaction};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Sum of amounts per category for one operation
///
/// Records without a category are grouped under `Unclassified`.
///
/// # Arguments
///
/// * `transactions` - Records to group
/// * `operation` - Only records of this operation contribute
///
/// # Returns
///
/// Map of category label to total, ordered by label
pub fn category_totals(transactions: &[Transaction], operation: Operation) -> BTreeMap<String, Decimal> {
    group_totals(transactions, operation, |tx| tx.display_category())
}

/// Sum of amounts per `type` column for one operation
///
/// Records without a type are grouped under `Unclassified`.
pub fn kind_totals(transactions: &[Transaction], operation: Operation) -> BTreeMap<String, Decimal> {
    group_totals(transactions, operation, |tx| tx.display_kind())
}

fn group_totals<F>(transactions: &[Transaction], operation: Operation, key: F) -> BTreeMap<String, Decimal>
where
    F: Fn(&Transaction) -> &str,
{
    let mut totals = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.operation == operation) {
        *totals.entry(key(tx).to_string()).or_insert(Decimal::ZERO) += tx.amount;
    }
    totals
}

/// Total of one operation in the calendar month containing `date`
pub fn month_total(transactions: &[Transaction], operation: Operation, date: NaiveDate) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.operation == operation && same_month(tx.date(), date))
        .map(|tx| tx.amount)
        .sum()
}

/// Entry with the highest value; ties go to the first key in order
pub fn top_entry(totals: &BTreeMap<String, Decimal>) -> Option<(&str, Decimal)> {
    totals.iter().fold(None, |best, (key, value)| match best {
        Some((_, best_value)) if best_value >= *value => best,
        _ => Some((key.as_str(), *value)),
    })
}

/// Income and expense of one year, overall and per month
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSummary {
    pub year: i32,
    pub income: Decimal,
    pub expense: Decimal,

    /// January at index 0
    pub monthly_income: [Decimal; 12],

    /// January at index 0
    pub monthly_expense: [Decimal; 12],
}

impl AnnualSummary {
    /// Income minus expense for the year
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }
}

/// Build the annual income/expense breakdown for `year`
pub fn annual_summary(transactions: &[Transaction], year: i32) -> AnnualSummary {
    let mut summary = AnnualSummary {
        year,
        income: Decimal::ZERO,
        expense: Decimal::ZERO,
        monthly_income: [Decimal::ZERO; 12],
        monthly_expense: [Decimal::ZERO; 12],
    };

    for tx in transactions.iter().filter(|tx| tx.timestamp.year() == year) {
        let month = tx.timestamp.month0() as usize;
        match tx.operation {
            Operation::Income => {
                summary.income += tx.amount;
                summary.monthly_income[month] += tx.amount;
            }
            Operation::Expense => {
                summary.expense += tx.amount;
                summary.monthly_expense[month] += tx.amount;
            }
        }
    }

    summary
}

/// Year totals with running balance and year-over-year change
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialSummary {
    pub year: i32,
    pub income: Decimal,
    pub expense: Decimal,

    /// Income minus expense over the whole history
    pub balance: Decimal,

    /// Percentage change against the previous year; `None` when that year had no income
    pub income_change: Option<Decimal>,

    /// Percentage change against the previous year; `None` when that year had no expense
    pub expense_change: Option<Decimal>,
}

/// Build the financial summary of `year`
pub fn financial_summary(transactions: &[Transaction], year: i32) -> FinancialSummary {
    let current = annual_summary(transactions, year);
    let previous = annual_summary(transactions, year - 1);

    let balance: Decimal = transactions
        .iter()
        .map(|tx| match tx.operation {
            Operation::Income => tx.amount,
            Operation::Expense => -tx.amount,
        })
        .sum();

    FinancialSummary {
        year,
        income: current.income,
        expense: current.expense,
        balance,
        income_change: percent_change(previous.income, current.income),
        expense_change: percent_change(previous.expense, current.expense),
    }
}

fn percent_change(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }
    Some((current - previous) / previous * Decimal::ONE_HUNDRED)
}

/// Label with its share of the year's expense
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    pub label: String,
    pub amount: Decimal,

    /// Percentage of the year's total expense
    pub percent: Decimal,
}

/// Where and how a user spent during one year
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingProfile {
    pub year: i32,
    pub expense_count: usize,
    pub total_expense: Decimal,

    /// Largest single expense with its category label
    pub largest_expense: Option<(Decimal, String)>,

    pub top_payment_method: Option<Share>,
    pub top_location: Option<Share>,
}

/// Build the spending profile of `year`
pub fn spending_profile(transactions: &[Transaction], year: i32) -> SpendingProfile {
    let expenses: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.is_expense() && tx.timestamp.year() == year)
        .collect();

    let total_expense: Decimal = expenses.iter().map(|tx| tx.amount).sum();

    let mut largest_expense: Option<(Decimal, String)> = None;
    let mut payment_methods: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut locations: BTreeMap<String, Decimal> = BTreeMap::new();

    for tx in &expenses {
        if largest_expense.as_ref().map_or(true, |(amount, _)| tx.amount > *amount) {
            largest_expense = Some((tx.amount, tx.display_category().to_string()));
        }
        let method = tx.payment_method.as_deref().unwrap_or(UNCLASSIFIED_LABEL);
        *payment_methods.entry(method.to_string()).or_insert(Decimal::ZERO) += tx.amount;
        let location = tx.location.as_deref().unwrap_or(UNCLASSIFIED_LABEL);
        *locations.entry(location.to_string()).or_insert(Decimal::ZERO) += tx.amount;
    }

    let share = |totals: &BTreeMap<String, Decimal>| {
        top_entry(totals).map(|(label, amount)| Share {
            label: label.to_string(),
            amount,
            percent: if total_expense > Decimal::ZERO {
                amount / total_expense * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            },
        })
    };

    SpendingProfile {
        year,
        expense_count: expenses.len(),
        total_expense,
        largest_expense,
        top_payment_method: share(&payment_methods),
        top_location: share(&locations),
    }
}
