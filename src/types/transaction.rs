//! Transaction-related types for the budget ledger
//!
//! This module defines the ledger record, its operation kind, and the
//! construction/validation rules every persisted record obeys:
//!
//! - `username` is non-empty
//! - `amount` is a non-negative magnitude with 2 decimal places; direction is
//!   carried by `operation`
//! - `timestamp` has minute precision and renders as `yyyy/MM/dd HH:mm`
//! - optional descriptive fields are `None` when unclassified

use crate::types::error::LedgerError;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

/// Canonical on-disk timestamp format (24-hour clock)
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Date-only format accepted on input and normalised to midnight
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Wire sentinel for an unclassified optional field
pub const UNCLASSIFIED_CODE: &str = "u";

/// Display label for an unclassified optional field
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// Number of decimal places money values carry
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a single record may carry (10^15)
///
/// Keeps every per-user sum and ratio product far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Direction of a ledger record
///
/// Legacy producers wrote `Transfer In`/`Deposit` and `Transfer Out`/`Withdrawal`;
/// these decode to `Income` and `Expense` respectively (see [`Operation::from_legacy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Money received
    Income,

    /// Money spent
    Expense,
}

impl Operation {
    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Income => "Income",
            Operation::Expense => "Expense",
        }
    }

    /// Parse an operation, accepting legacy aliases
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn from_legacy(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "income" | "transfer in" | "deposit" => Some(Operation::Income),
            "expense" | "transfer out" | "withdrawal" => Some(Operation::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = LedgerError;

    /// Strict parse: only `Income` or `Expense` (any case)
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "income" => Ok(Operation::Income),
            "expense" => Ok(Operation::Expense),
            _ => Err(LedgerError::validation(
                "operation",
                format!("'{}' is not Income or Expense", value),
            )),
        }
    }
}

/// Canonical key used to compare usernames
///
/// Username matching is case-insensitive and whitespace-trimmed everywhere
/// (ledger scans, record removal, and the custom budget overlay).
pub fn user_key(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Parse a ledger timestamp
///
/// Accepts `yyyy/MM/dd HH:mm` and the bare `yyyy/MM/dd` (normalised to 00:00).
/// Returns `None` for anything else, including the dash-separated format some
/// legacy writers produced.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Format a timestamp the way the ledger stores it
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Round a money value to the ledger's precision
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Map an optional field to `None` when it is empty or the unclassified sentinel
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case(UNCLASSIFIED_CODE) => {
            Some(v.to_string())
        }
        _ => None,
    }
}

/// A single ledger record
///
/// Immutable once written: records are only ever appended, and removed solely
/// to roll back a failed paired write. Build instances through
/// [`Transaction::builder`], which validates and normalises every field.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Owner of the record
    pub username: String,

    /// Income or expense
    pub operation: Operation,

    /// Non-negative magnitude, 2 decimal places
    pub amount: Decimal,

    /// Minute-precision timestamp
    pub timestamp: NaiveDateTime,

    pub merchant: Option<String>,

    /// The `type` column of the ledger
    pub kind: Option<String>,

    pub remark: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    pub tag: Option<String>,
    pub attachment: Option<String>,
    pub recurrence: Option<String>,
}

impl Transaction {
    /// Start building a transaction from its required fields
    ///
    /// # Arguments
    ///
    /// * `username` - Owner of the record
    /// * `operation` - Income or Expense
    /// * `amount` - Non-negative magnitude
    /// * `timestamp` - `yyyy/MM/dd HH:mm` or `yyyy/MM/dd`
    pub fn builder(
        username: impl Into<String>,
        operation: Operation,
        amount: Decimal,
        timestamp: impl Into<String>,
    ) -> TransactionBuilder {
        TransactionBuilder {
            username: username.into(),
            operation,
            amount,
            timestamp: timestamp.into(),
            optional: OptionalFields::default(),
        }
    }

    /// Check the persistence invariants
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the username is blank or the amount
    /// is negative.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.username.trim().is_empty() {
            return Err(LedgerError::validation("username", "must not be empty"));
        }
        if self.amount < Decimal::ZERO {
            return Err(LedgerError::validation(
                "amount",
                format!("{} must not be negative", self.amount),
            ));
        }
        if self.amount > MAX_AMOUNT {
            return Err(LedgerError::validation(
                "amount",
                format!("{} exceeds the maximum of {}", self.amount, MAX_AMOUNT),
            ));
        }
        Ok(())
    }

    /// Calendar date of the record
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Timestamp in ledger format
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    pub fn is_income(&self) -> bool {
        self.operation == Operation::Income
    }

    pub fn is_expense(&self) -> bool {
        self.operation == Operation::Expense
    }

    /// Whether this record belongs to the user with the given [`user_key`]
    pub fn belongs_to(&self, key: &str) -> bool {
        user_key(&self.username) == key
    }

    /// Category label, `Unclassified` when absent
    pub fn display_category(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCLASSIFIED_LABEL)
    }

    /// Type label, `Unclassified` when absent
    pub fn display_kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNCLASSIFIED_LABEL)
    }
}

#[derive(Debug, Clone, Default)]
struct OptionalFields {
    merchant: Option<String>,
    kind: Option<String>,
    remark: Option<String>,
    category: Option<String>,
    payment_method: Option<String>,
    location: Option<String>,
    tag: Option<String>,
    attachment: Option<String>,
    recurrence: Option<String>,
}

/// Validating builder for [`Transaction`]
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    username: String,
    operation: Operation,
    amount: Decimal,
    timestamp: String,
    optional: OptionalFields,
}

macro_rules! optional_setter {
    ($name:ident) => {
        pub fn $name(mut self, value: impl AsRef<str>) -> Self {
            self.optional.$name = normalize_optional(Some(value.as_ref()));
            self
        }
    };
}

impl TransactionBuilder {
    optional_setter!(merchant);
    optional_setter!(kind);
    optional_setter!(remark);
    optional_setter!(category);
    optional_setter!(payment_method);
    optional_setter!(location);
    optional_setter!(tag);
    optional_setter!(attachment);
    optional_setter!(recurrence);

    /// Validate and produce the transaction
    ///
    /// The amount is rounded to 2 decimal places and the timestamp truncated
    /// to the minute, so the result round-trips through the ledger encoding.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if:
    /// - The username is blank
    /// - The amount is negative
    /// - The timestamp is not `yyyy/MM/dd HH:mm` or `yyyy/MM/dd`
    pub fn build(self) -> Result<Transaction, LedgerError> {
        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            LedgerError::validation(
                "timestamp",
                format!("'{}' is not yyyy/MM/dd [HH:mm]", self.timestamp),
            )
        })?;

        let transaction = Transaction {
            username: self.username,
            operation: self.operation,
            amount: round_money(self.amount),
            timestamp: timestamp.with_second(0).unwrap_or(timestamp),
            merchant: self.optional.merchant,
            kind: self.optional.kind,
            remark: self.optional.remark,
            category: self.optional.category,
            payment_method: self.optional.payment_method,
            location: self.optional.location,
            tag: self.optional.tag,
            attachment: self.optional.attachment,
            recurrence: self.optional.recurrence,
        };
        transaction.validate()?;
        Ok(transaction)
    }
}
