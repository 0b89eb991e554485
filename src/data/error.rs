use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Load-time errors (fatal)
// ---------------------------------------------------------------------------

/// Errors that stop the pipeline before a table can be produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The listings file is missing or cannot be opened.
    #[error("cannot read listings file '{path}': {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// The source file does not have the shape the pipeline needs.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaMismatch {
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),

    #[error("row {row}, column '{column}': expected {expected}, found '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("column '{column}' has unsupported type {found}")]
    WrongColumnType { column: &'static str, found: String },
}

// ---------------------------------------------------------------------------
// Row-level problems (recovered locally)
// ---------------------------------------------------------------------------

/// Why a single row was rejected. Never aborts the pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedRecord {
    #[error("model is empty")]
    EmptyModel,

    #[error("'{column}' is missing")]
    MissingValue { column: &'static str },

    #[error("'{column}' is negative ({value})")]
    NegativeValue { column: &'static str, value: f64 },
}
