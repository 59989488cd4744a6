//! Error types for the Refinery library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Refinery operations.
///
/// Every variant is fatal to the call that produced it: operations validate
/// their arguments before touching the table, so an `Err` means nothing was
/// committed. Row-level problems (such as an unparseable date) are handled
/// per row and never surface here.
#[derive(Debug, Error)]
pub enum RefineryError {
    /// Neither a file path nor an in-memory table was supplied.
    #[error("No data source: provide either a file path or an in-memory table")]
    MissingSource,

    /// Both a file path and an in-memory table were supplied.
    #[error("Ambiguous data source: provide a file path or an in-memory table, not both")]
    AmbiguousSource,

    /// A referenced column does not exist in the table.
    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    /// A numeric-only operation was given a non-numeric column.
    #[error("Column '{0}' is not numeric")]
    NotNumericColumn(String),

    /// Unrecognized missing-value strategy.
    #[error("Unsupported strategy '{0}': choose drop, mean, median or most_frequent")]
    UnsupportedStrategy(String),

    /// Unrecognized duplicate-handling method or retention policy.
    #[error("Unsupported method '{0}'")]
    UnsupportedMethod(String),

    /// Unrecognized output format.
    #[error("Unsupported format '{0}': use csv or xlsx")]
    UnsupportedFormat(String),

    /// The index is not temporal after coercion, or an operation needs a
    /// datetime index.
    #[error("Index is not datetime: {0}")]
    IndexNotDatetime(String),

    /// A file could not be loaded as a table.
    #[error("Unreadable file '{path}': {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    /// Error reading, writing or creating a file or directory.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An argument was outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from the CSV library while writing.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from the spreadsheet writer.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RefineryError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefineryError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `UnreadableFile` error.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        RefineryError::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Refinery operations.
pub type Result<T> = std::result::Result<T, RefineryError>;
