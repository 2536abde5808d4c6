use thiserror::Error;

/// Load-time validation failures for the ranges, weights and content documents.
///
/// Every variant names the offending field so a failed startup can be fixed without
/// guessing which of the documents is wrong.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{document}: parse error: {message}")]
    Parse {
        document: &'static str,
        message: String,
    },

    #[error("{document}: missing required key `{key}`")]
    MissingKey { document: &'static str, key: String },

    #[error("`{field}` must be positive, got {value}")]
    NotPositive { field: String, value: String },

    #[error("`{field}` must be an integer, got {value}")]
    NotInteger { field: String, value: String },

    #[error("`{field}`: min ({min}) must be below max ({max})")]
    InvertedRange { field: String, min: i64, max: i64 },

    #[error("`{field}` = {value} is outside {expected}")]
    OutOfRange {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("weights must sum to {expected}, got {found}")]
    WeightSum { expected: u32, found: u64 },

    #[error("content: {0}")]
    InvalidContent(String),
}
