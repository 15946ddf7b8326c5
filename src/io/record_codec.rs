//! Ledger record encoding and decoding
//!
//! This module centralizes the on-disk format of a single ledger record:
//! - The canonical header line
//! - Encoding a `Transaction` into one CSV line
//! - Decoding a CSV line (or an already-split record) back into a `Transaction`
//!
//! Fields containing the delimiter, a quote or a newline are quoted with
//! internal quotes doubled (standard CSV escaping, delegated to the `csv` crate).
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::transaction::{normalize_optional, round_money, MAX_AMOUNT, UNCLASSIFIED_CODE};
use crate::types::{LedgerError, Operation, Transaction};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use rust_decimal::Decimal;
use std::str::FromStr;

pub use crate::types::transaction::parse_timestamp;

/// Canonical first line of every ledger file
pub const LEDGER_HEADER: &str =
    "user,operation,amount,time,merchant,type,remark,category,payment_method,location,tag,attachment,recurrence";

/// Total number of columns in a ledger record
pub const FIELD_COUNT: usize = 13;

/// Minimum number of columns a record must carry to be decodable
///
/// `user,operation,amount,time,merchant`; any missing trailing optional
/// field is treated as unclassified.
pub const MIN_FIELDS: usize = 5;

/// Whether a header line matches the canonical ledger header
///
/// Comparison ignores ASCII case, surrounding whitespace and a UTF-8 BOM.
pub fn is_ledger_header(line: &str) -> bool {
    line.trim_start_matches('\u{feff}')
        .trim()
        .eq_ignore_ascii_case(LEDGER_HEADER)
}

/// Render the columns of a transaction in ledger order
pub fn to_fields(transaction: &Transaction) -> [String; FIELD_COUNT] {
    let optional = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| UNCLASSIFIED_CODE.to_string())
    };

    [
        transaction.username.clone(),
        transaction.operation.as_str().to_string(),
        format!("{:.2}", transaction.amount),
        transaction.formatted_timestamp(),
        optional(&transaction.merchant),
        optional(&transaction.kind),
        optional(&transaction.remark),
        optional(&transaction.category),
        optional(&transaction.payment_method),
        optional(&transaction.location),
        optional(&transaction.tag),
        optional(&transaction.attachment),
        optional(&transaction.recurrence),
    ]
}

/// Encode a transaction as a single ledger line (without the line terminator)
///
/// # Arguments
///
/// * `transaction` - The record to encode
///
/// # Returns
///
/// * `Ok(String)` - The encoded line
/// * `Err(LedgerError)` - If the CSV writer failed (only on non-UTF-8 output,
///   which cannot happen for `String` fields)
pub fn encode(transaction: &Transaction) -> Result<String, LedgerError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::with_capacity(128));

    writer.write_record(to_fields(transaction))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::Io {
            message: e.to_string(),
        })?;
    let mut line = String::from_utf8(bytes).map_err(|e| LedgerError::Io {
        message: e.to_string(),
    })?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Decode a single ledger line
///
/// # Arguments
///
/// * `line` - One CSV line, with or without the trailing newline
///
/// # Returns
///
/// * `Ok(Transaction)` - Successfully decoded record
/// * `Err(LedgerError::Parse)` - Too few fields, bad amount, bad timestamp or
///   unknown operation
pub fn decode(line: &str) -> Result<Transaction, LedgerError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(LedgerError::parse(None, "empty line"));
    }

    decode_record(&record)
}

/// Decode a record already split by a CSV reader
///
/// The line number is taken from the record's position when the reader
/// tracked one.
pub fn decode_record(record: &StringRecord) -> Result<Transaction, LedgerError> {
    let line = record.position().map(|pos| pos.line());
    let fields: Vec<&str> = record.iter().collect();
    decode_fields(&fields, line)
}

/// Decode a record from its individual fields
///
/// This function:
/// - Requires at least `user,operation,amount,time,merchant`
/// - Accepts the legacy operation names (`Transfer In`, `Deposit`, ...)
/// - Rejects non-numeric or negative amounts
/// - Accepts `yyyy/MM/dd HH:mm` and `yyyy/MM/dd` timestamps
/// - Treats missing, empty or `u` optional fields as unclassified
///
/// # Arguments
///
/// * `fields` - Column values in ledger order
/// * `line` - Line number used in error messages (if known)
///
/// # Returns
///
/// Result containing either:
/// - Ok(Transaction) - Successfully decoded record
/// - Err(LedgerError::Parse) - Description of the first offending field
pub fn decode_fields(fields: &[&str], line: Option<u64>) -> Result<Transaction, LedgerError> {
    if fields.len() < MIN_FIELDS {
        return Err(LedgerError::parse(
            line,
            format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            ),
        ));
    }

    let username = fields[0];
    if username.trim().is_empty() {
        return Err(LedgerError::parse(line, "empty username"));
    }

    let operation = Operation::from_legacy(fields[1])
        .ok_or_else(|| LedgerError::parse(line, format!("Invalid operation '{}'", fields[1])))?;

    let amount = parse_amount(fields[2])
        .ok_or_else(|| LedgerError::parse(line, format!("Invalid amount '{}'", fields[2])))?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::parse(
            line,
            format!("Negative amount '{}'", fields[2]),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::parse(
            line,
            format!("Amount '{}' exceeds {}", fields[2], MAX_AMOUNT),
        ));
    }

    let timestamp = parse_timestamp(fields[3])
        .ok_or_else(|| LedgerError::parse(line, format!("Invalid time '{}'", fields[3])))?;

    let optional = |index: usize| normalize_optional(fields.get(index).copied());

    Ok(Transaction {
        username: username.to_string(),
        operation,
        amount: round_money(amount),
        timestamp,
        merchant: optional(4),
        kind: optional(5),
        remark: optional(6),
        category: optional(7),
        payment_method: optional(8),
        location: optional(9),
        tag: optional(10),
        attachment: optional(11),
        recurrence: optional(12),
    })
}

fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}
