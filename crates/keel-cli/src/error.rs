//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An input file is not valid JSON for its kind.
    #[error("Invalid {kind} file {path}: {source}")]
    Parse {
        /// What the file should contain.
        kind: &'static str,
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Arguments are inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
