//! Command dispatch onto the `Ledger` facade

use super::args::{AddArgs, BudgetAction, CliArgs, Command, ReportArgs};
use crate::core::Ledger;
use crate::types::transaction::parse_timestamp;
use crate::types::{LedgerError, Operation, Transaction};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::io::Write;

/// Execute one parsed command, writing its report to `output`
///
/// # Errors
///
/// Any error of the underlying ledger operation. I/O errors on `output`
/// are reported as `LedgerError::Io`.
pub fn run(args: CliArgs, output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut ledger = Ledger::open(args.to_ledger_config())?;

    match args.command {
        Command::Add(add) => {
            let transaction = build_transaction(add)?;
            ledger.add_transaction(&transaction)?;
            writeln!(output, "Recorded {} {:.2} at {}", transaction.operation, transaction.amount, transaction.formatted_timestamp())?;
        }
        Command::Remove { user, time } => {
            let timestamp = parse_timestamp(&time)
                .ok_or_else(|| LedgerError::validation("time", format!("'{}' is not yyyy/MM/dd HH:mm", time)))?;
            let removed = ledger.remove_transaction(&user, timestamp)?;
            writeln!(output, "{}", if removed { "Removed 1 record" } else { "No matching record" })?;
        }
        Command::List { user } => {
            for tx in ledger.read_transactions(&user)? {
                writeln!(
                    output,
                    "{}  {:<7} {:>12.2}  {}  {}",
                    tx.formatted_timestamp(),
                    tx.operation,
                    tx.amount,
                    tx.display_kind(),
                    tx.display_category()
                )?;
            }
        }
        Command::Recommend(ReportArgs { user, date }) => {
            let recommendation = ledger.recommend(&user, reference_date(date));
            writeln!(output, "{}", recommendation)?;
        }
        Command::Overview(ReportArgs { user, date }) => {
            let overview = ledger.overview(&user, reference_date(date));
            writeln!(output, "{}", overview.recommendation)?;
            writeln!(output, "Income this month:  {:.2}", overview.month_income)?;
            writeln!(output, "Expense this month: {:.2}", overview.month_expense)?;
            if let Some(kind) = &overview.top_expense_type {
                writeln!(output, "Top expense type:   {}", kind)?;
            }
            for large in &overview.large_expenses {
                writeln!(output, "Large expense: {}", large)?;
            }
        }
        Command::Budget { action } => match action {
            BudgetAction::Set { user, amount } => {
                ledger.save_custom_budget(&user, amount)?;
                writeln!(output, "Custom budget for {} set to {:.2}", user, amount)?;
            }
            BudgetAction::Show { user } => match ledger.get_custom_budget(&user) {
                Some(amount) => writeln!(output, "{:.2}", amount)?,
                None => writeln!(output, "No custom budget for {}", user)?,
            },
            BudgetAction::Clear { user } => {
                let cleared = ledger.clear_custom_budget(&user)?;
                writeln!(output, "{}", if cleared { "Custom budget cleared" } else { "No custom budget" })?;
            }
        },
        Command::Totals { user, operation } => {
            let history = ledger.read_transactions(&user)?;
            let totals = ledger.category_totals(&history, Operation::from(operation));
            for (category, total) in &totals {
                writeln!(output, "{},{:.2}", category, total)?;
            }
        }
        Command::Import { source } => {
            let report = ledger.import_transactions(&source)?;
            writeln!(output, "Imported {} records, skipped {}", report.imported, report.skipped)?;
        }
        Command::Export { user } => ledger.export_summary(&user, output)?,
        Command::Summary { user, year } => {
            let summary = ledger.financial_summary(&user, year)?;
            writeln!(output, "Year {}", summary.year)?;
            writeln!(output, "Income:  {:.2}{}", summary.income, change(summary.income_change))?;
            writeln!(output, "Expense: {:.2}{}", summary.expense, change(summary.expense_change))?;
            writeln!(output, "Balance: {:.2}", summary.balance)?;
        }
    }

    Ok(())
}

fn build_transaction(add: AddArgs) -> Result<Transaction, LedgerError> {
    let mut builder = Transaction::builder(add.user, Operation::from(add.operation), add.amount, add.time);
    if let Some(merchant) = add.merchant {
        builder = builder.merchant(merchant);
    }
    if let Some(kind) = add.kind {
        builder = builder.kind(kind);
    }
    if let Some(remark) = add.remark {
        builder = builder.remark(remark);
    }
    if let Some(category) = add.category {
        builder = builder.category(category);
    }
    if let Some(method) = add.payment_method {
        builder = builder.payment_method(method);
    }
    if let Some(location) = add.location {
        builder = builder.location(location);
    }
    if let Some(tag) = add.tag {
        builder = builder.tag(tag);
    }
    builder.build()
}

fn reference_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

fn change(percent: Option<Decimal>) -> String {
    percent.map_or_else(String::new, |p| format!(" ({:+.1}% vs previous year)", p))
}
