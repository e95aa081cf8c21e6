//! Error type for collaborator calls.

use thiserror::Error;

/// Failure reported by an external collaborator.
///
/// The analytics core never retries these; retry policy belongs to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Requested data does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The collaborator could not be reached.
    #[error("source not available: {0}")]
    Unavailable(String),

    /// The call timed out.
    #[error("timeout")]
    Timeout,

    /// The collaborator returned data that cannot be used.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl SourceError {
    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an invalid-data error.
    pub fn invalid_data(what: impl Into<String>) -> Self {
        Self::InvalidData(what.into())
    }
}
