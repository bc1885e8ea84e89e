//! Error types for Factory Metrics.

use thiserror::Error;

/// Result type alias for Factory Metrics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Factory Metrics.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Generation errors (20-29)
    #[error("invalid range for '{column}': lower bound {min} exceeds upper bound {max}")]
    InvalidRange {
        column: String,
        min: String,
        max: String,
    },

    #[error("categorical domain for '{column}' is empty")]
    EmptyDomain { column: String },

    #[error("invalid count for '{what}': {count} exceeds population of {population}")]
    InvalidCount {
        what: String,
        count: usize,
        population: usize,
    },

    #[error("generation failed: {0}")]
    Generation(String),

    // Table errors (30-39)
    #[error("column not found: '{column}'")]
    ColumnNotFound { column: String },

    #[error("column '{column}' has type {actual}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("aggregation failed: {0}")]
    Aggregation(String),

    // Output errors (40-49)
    #[error("export failed: {0}")]
    Export(String),

    #[error("render failed: {0}")]
    Render(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidRange { .. } => 20,
            Error::EmptyDomain { .. } => 21,
            Error::InvalidCount { .. } => 22,
            Error::Generation(_) => 23,
            Error::ColumnNotFound { .. } => 30,
            Error::ColumnType { .. } => 31,
            Error::Aggregation(_) => 32,
            Error::Export(_) => 40,
            Error::Render(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Shorthand for a missing column.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }
}
