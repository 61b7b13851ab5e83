//! Error types for loading and exporting course tables.

use thiserror::Error;

/// Fatal failure while building a snapshot. No partial data is exposed.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input table has no data rows")]
    Empty,

    #[error("none of the input headers is a known course column (found: {0})")]
    NoRecognizedHeaders(String),
}

/// Failure while writing an export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-record problems absorbed during normalization. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIssue {
    /// The date cell did not resolve to a start date.
    DateParseFailure { row: usize, text: String },
    /// The survey cell did not encode a percentage.
    SurveyParseFailure { row: usize, text: String },
    /// A count cell was present but unusable and was read as zero.
    NumericCoerced { row: usize, column: &'static str, text: String },
    /// A cell was not valid UTF-8; bad bytes were replaced with U+FFFD.
    InvalidEncoding { row: usize },
    /// The CSV reader could not produce the row at all; it was skipped.
    UnreadableRow { row: usize, reason: String },
}
