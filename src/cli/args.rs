use crate::config::{LedgerConfig, DEFAULT_BUDGET_PATH, DEFAULT_LEDGER_PATH};
use crate::types::transaction::DATE_FORMAT;
use crate::types::Operation;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Track income and expenses and get monthly budget recommendations
#[derive(Parser, Debug)]
#[command(name = "budget-ledger")]
#[command(about = "Track income and expenses and get monthly budget recommendations", long_about = None)]
pub struct CliArgs {
    /// Ledger CSV file shared by all users
    #[arg(
        long = "ledger",
        value_name = "FILE",
        global = true,
        default_value = DEFAULT_LEDGER_PATH,
        help = "Path to the ledger CSV file"
    )]
    pub ledger: PathBuf,

    /// Custom budget overlay file
    #[arg(
        long = "budgets",
        value_name = "FILE",
        global = true,
        default_value = DEFAULT_BUDGET_PATH,
        help = "Path to the custom budget CSV file"
    )]
    pub budgets: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a transaction
    Add(AddArgs),

    /// Roll back the first record of a user at a timestamp
    Remove {
        #[arg(long)]
        user: String,

        /// yyyy/MM/dd HH:mm
        #[arg(long)]
        time: String,
    },

    /// Print a user's history
    List {
        #[arg(long)]
        user: String,
    },

    /// Print the budget recommendation for a month
    Recommend(ReportArgs),

    /// Print the budget panel figures for a month
    Overview(ReportArgs),

    /// Manage a user's custom monthly budget
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Print totals per category
    Totals {
        #[arg(long)]
        user: String,

        #[arg(long, value_enum, default_value = "expense")]
        operation: OperationArg,
    },

    /// Append every valid record of another ledger file
    Import {
        #[arg(value_name = "FILE")]
        source: PathBuf,
    },

    /// Write a user's history as a transaction summary CSV
    Export {
        #[arg(long)]
        user: String,
    },

    /// Print a user's yearly financial summary
    Summary {
        #[arg(long)]
        user: String,

        #[arg(long)]
        year: i32,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long, value_enum)]
    pub operation: OperationArg,

    #[arg(long)]
    pub amount: Decimal,

    /// yyyy/MM/dd HH:mm or yyyy/MM/dd
    #[arg(long)]
    pub time: String,

    #[arg(long)]
    pub merchant: Option<String>,

    /// The `type` column
    #[arg(long = "type")]
    pub kind: Option<String>,

    #[arg(long)]
    pub remark: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long = "payment-method")]
    pub payment_method: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub user: String,

    /// Reference date (yyyy/MM/dd), today when omitted
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum BudgetAction {
    /// Set the custom monthly budget
    Set {
        #[arg(long)]
        user: String,

        #[arg(long)]
        amount: Decimal,
    },

    /// Print the custom monthly budget
    Show {
        #[arg(long)]
        user: String,
    },

    /// Remove the custom monthly budget
    Clear {
        #[arg(long)]
        user: String,
    },
}

/// Operation accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    Income,
    Expense,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Income => Operation::Income,
            OperationArg::Expense => Operation::Expense,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| format!("'{}' is not yyyy/MM/dd", value))
}

impl CliArgs {
    /// Build a LedgerConfig from the global path options
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig::new(&self.ledger, &self.budgets)
    }
}
