//! Transaction summary export
//!
//! Writes the reduced five-column view of a user's history consumed by report
//! collaborators: `Operation,Amount,Time,Merchant/Payee,Type`.

use crate::types::{LedgerError, Transaction};
use csv::Writer;
use std::io::Write;

/// Header of the summary export
pub const SUMMARY_HEADER: [&str; 5] = ["Operation", "Amount", "Time", "Merchant/Payee", "Type"];

/// Write transactions in summary form
///
/// Rows keep the order of `transactions`. Amounts are written with 2 decimal
/// places and unclassified fields as `Unclassified`.
///
/// # Arguments
///
/// * `transactions` - Records to export
/// * `output` - Destination writer
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(LedgerError::Io)` if a write error occurred
pub fn write_transaction_summary(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(SUMMARY_HEADER)?;

    for tx in transactions {
        writer.write_record([
            tx.operation.as_str().to_string(),
            format!("{:.2}", tx.amount),
            tx.formatted_timestamp(),
            tx.merchant
                .clone()
                .unwrap_or_else(|| crate::types::transaction::UNCLASSIFIED_LABEL.to_string()),
            tx.display_kind().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
