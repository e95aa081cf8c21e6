//! Engine error types.

use std::fmt;

use keel_config::ConfigError;
use keel_core::{AnalyticsError, ErrorKind};
use keel_traits::SourceError;
use thiserror::Error;

/// Engine result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An analytics computation failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// A collaborator call failed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Settings could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required component was not supplied to the builder.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    /// Analytics failure of the given kind.
    Analytics(ErrorKind),
    /// Collaborator failure; retry policy belongs to the caller.
    Source,
    /// Settings or builder misconfiguration.
    Configuration,
    /// Task failure inside the engine.
    Internal,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analytics(kind) => kind.fmt(f),
            Self::Source => f.write_str("SOURCE"),
            Self::Configuration => f.write_str("CONFIGURATION"),
            Self::Internal => f.write_str("INTERNAL"),
        }
    }
}

impl EngineError {
    /// Machine-checkable kind of this error.
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            Self::Analytics(e) => EngineErrorKind::Analytics(e.kind()),
            Self::Source(_) => EngineErrorKind::Source,
            Self::Config(_) | Self::NotConfigured(_) => EngineErrorKind::Configuration,
            Self::Internal(_) => EngineErrorKind::Internal,
        }
    }

    /// Analytics kind, if this is an analytics failure.
    pub fn analytics_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Analytics(e) => Some(e.kind()),
            _ => None,
        }
    }
}
