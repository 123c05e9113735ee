//! Error types for schema authorization and assembly

use crate::scope::ScopeError;
use scopeql_pagination::PaginationError;
use thiserror::Error;

/// Schema authorization errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No schema is configured under the requested name
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// Type loader could not resolve a name
    #[error("Type {0} not found.")]
    TypeNotFound(String),

    /// Pagination token rejected
    #[error("Invalid cursor")]
    InvalidCursor,

    /// Scope string rejected by the strict parser
    #[error("Invalid scope format '{expression}': {source}")]
    InvalidScopeFormat {
        expression: String,
        #[source]
        source: ScopeError,
    },

    /// A configured reference has no registered factory
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache backend error
    #[error("Cache error: {0}")]
    Cache(String),

    /// List resolution error
    #[error("Pagination error: {0}")]
    Pagination(PaginationError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PaginationError> for AuthzError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::InvalidCursor => Self::InvalidCursor,
            other => Self::Pagination(other),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
