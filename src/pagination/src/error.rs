//! Error types for cursor handling and list resolution

use thiserror::Error;

/// Pagination errors
#[derive(Debug, Error)]
pub enum PaginationError {
    /// The `after` token could not be decrypted or deserialized
    #[error("Invalid cursor")]
    InvalidCursor,

    /// Ordering requested on a field the list does not expose
    #[error("Unknown order field: {0}")]
    UnknownOrderField(String),

    /// Filter requested that the list does not declare
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// Filter value of the wrong shape
    #[error("Invalid value for filter '{0}'")]
    InvalidFilter(String),

    /// Cursor could not be sealed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Data-access layer failure
    #[error("Query error: {0}")]
    Query(String),
}

/// Result type for pagination operations
pub type Result<T> = std::result::Result<T, PaginationError>;
