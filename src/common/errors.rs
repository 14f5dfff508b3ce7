//! Error types for the application

use thiserror::Error;

/// Result type alias using our LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed fill input (missing fields, non-positive price/size).
    /// Raised before any write is attempted.
    #[error("Invalid fill: {0}")]
    Validation(String),

    /// Underlying database/transaction failures
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
