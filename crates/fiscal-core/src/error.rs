//! Caller-input error types shared across Fiscal services

use thiserror::Error;

/// Errors caused by invalid caller input. These are always terminal: the
/// caller must fix the request, retrying cannot help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid CNPJ: {0}")]
    InvalidCnpj(String),

    #[error("Invalid date format, expected YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("Invalid period: start date {start} is after end date {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Unknown jurisdiction code: {0}")]
    UnknownJurisdiction(String),
}

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
