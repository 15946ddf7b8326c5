//! Error types for the budget ledger
//!
//! This module defines every error the ledger, the custom budget overlay and
//! the writer actor can report.
//!
//! # Error Categories
//!
//! - **Validation Errors**: Malformed input to `append`/`set` (empty username,
//!   negative amount, unparseable timestamp). Rejected before any I/O.
//! - **Parse Errors**: A malformed ledger or overlay line. Recovered locally:
//!   the line is logged and skipped, the scan continues.
//! - **I/O Errors**: A file cannot be created, read or written. Surfaced to
//!   the caller, who owns user-facing messaging.
//! - **Writer Errors**: Back-pressure and shutdown of the single writer thread.

use thiserror::Error;

/// Main error type for the budget ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Input rejected before any file was touched
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// A ledger or overlay record could not be decoded
    ///
    /// This is a recoverable error - the record is skipped
    /// and scanning continues with the next one.
    #[error("Parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// A file that must exist (e.g. an import source) was not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// The first row of a ledger file is not the canonical header
    #[error("Invalid header. Expected '{expected}', found '{actual}'")]
    InvalidHeader {
        /// The canonical header line
        expected: String,
        /// The header line actually found
        actual: String,
    },

    /// The writer queue is full and the caller asked not to wait
    #[error("Writer queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The writer thread has stopped and no longer accepts commands
    #[error("Ledger writer has shut down")]
    WriterClosed,
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        if let csv::ErrorKind::Io(_) = error.kind() {
            return LedgerError::Io {
                message: error.to_string(),
            };
        }

        LedgerError::Parse {
            line: error.position().map(|pos| pos.line()),
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create a Validation error
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a FileNotFound error
    pub fn file_not_found(path: &std::path::Path) -> Self {
        LedgerError::FileNotFound {
            path: path.display().to_string(),
        }
    }

    /// Create an InvalidHeader error
    pub fn invalid_header(expected: &str, actual: &str) -> Self {
        LedgerError::InvalidHeader {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Attach a line number to a Parse error; other variants pass through
    pub fn at_line(self, line: Option<u64>) -> Self {
        match self {
            LedgerError::Parse { line: None, message } => LedgerError::Parse { line, message },
            other => other,
        }
    }

    /// Whether the error only concerns a single record
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::Parse { .. } | LedgerError::Validation { .. }
        )
    }
}
