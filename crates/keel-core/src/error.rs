//! Error types for the Keel analytics core.
//!
//! Every analytics failure is a deterministic function of its inputs. Errors
//! carry a machine-checkable [`ErrorKind`] plus enough context (symbol,
//! requested value, limit) for the caller to act on them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::{MarginType, Symbol};

/// A specialized Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Machine-checkable classification of an [`AnalyticsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A request parameter is outside its valid domain.
    InvalidParameter,
    /// The input series is too short for the selected method.
    InsufficientData,
    /// The covariance matrix could not be inverted or regularized.
    SingularCovariance,
    /// Requested leverage exceeds the configured maximum.
    LeverageLimitExceeded,
    /// An input snapshot is older than its freshness window.
    StaleData,
    /// An iterative solver stopped before reaching its tolerance.
    ConvergenceFailed,
    /// The caller cancelled a long-running computation.
    Cancelled,
}

impl ErrorKind {
    /// Stable string identifier for the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::SingularCovariance => "SINGULAR_COVARIANCE",
            Self::LeverageLimitExceeded => "LEVERAGE_LIMIT_EXCEEDED",
            Self::StaleData => "STALE_DATA",
            Self::ConvergenceFailed => "CONVERGENCE_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for analytics operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// A parameter is outside its valid domain.
    #[error("Invalid parameter '{parameter}' = {value}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: String,
        /// The rejected value, rendered for display.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Not enough observations for the requested computation.
    #[error("Insufficient data for {context}: need at least {required}, got {actual}")]
    InsufficientData {
        /// What was being computed.
        context: String,
        /// Minimum number of observations.
        required: usize,
        /// Observations actually supplied.
        actual: usize,
    },

    /// The covariance matrix is singular even after regularization.
    #[error("Singular covariance matrix: {reason}")]
    SingularCovariance {
        /// Description of the failure.
        reason: String,
    },

    /// Requested leverage is above the configured maximum.
    #[error(
        "Leverage limit exceeded for {symbol} ({margin_type}): requested {requested}x, limit {limit}x"
    )]
    LeverageLimitExceeded {
        /// Symbol whose leverage was being changed.
        symbol: Symbol,
        /// Margin mode of the request.
        margin_type: MarginType,
        /// Requested multiplier.
        requested: Decimal,
        /// Configured maximum multiplier.
        limit: Decimal,
    },

    /// A snapshot is older than its allowed freshness window.
    #[error("Stale data from {source_name}: age {age_seconds}s exceeds {max_age_seconds}s")]
    StaleData {
        /// Which snapshot was stale (e.g. "returns:BTC-USD").
        source_name: String,
        /// Observed age in seconds.
        age_seconds: i64,
        /// Allowed age in seconds.
        max_age_seconds: i64,
    },

    /// A lifecycle transition that the margin state machine does not allow.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// An iterative solver hit its iteration limit with a residual above
    /// the acceptable level. The inputs were usable; the solver was not.
    #[error("No convergence for {context} after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailed {
        /// What was being solved.
        context: String,
        /// Iterations attempted.
        iterations: u32,
        /// Final residual.
        residual: f64,
    },

    /// Work was cancelled by the caller.
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that observed the cancellation.
        operation: String,
    },
}

impl AnalyticsError {
    /// Returns the machine-checkable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. } | Self::InvalidTransition { .. } => {
                ErrorKind::InvalidParameter
            }
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::SingularCovariance { .. } => ErrorKind::SingularCovariance,
            Self::LeverageLimitExceeded { .. } => ErrorKind::LeverageLimitExceeded,
            Self::StaleData { .. } => ErrorKind::StaleData,
            Self::ConvergenceFailed { .. } => ErrorKind::ConvergenceFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an insufficient data error.
    #[must_use]
    pub fn insufficient_data(context: impl Into<String>, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            actual,
        }
    }

    /// Creates a singular covariance error.
    #[must_use]
    pub fn singular_covariance(reason: impl Into<String>) -> Self {
        Self::SingularCovariance {
            reason: reason.into(),
        }
    }

    /// Creates a solver non-convergence error.
    #[must_use]
    pub fn convergence_failed(context: impl Into<String>, iterations: u32, residual: f64) -> Self {
        Self::ConvergenceFailed {
            context: context.into(),
            iterations,
            residual,
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }
}

/// Validates a confidence level lies strictly inside (0, 1).
pub fn validate_confidence(confidence_level: f64) -> AnalyticsResult<()> {
    if confidence_level.is_finite() && confidence_level > 0.0 && confidence_level < 1.0 {
        Ok(())
    } else {
        Err(AnalyticsError::invalid_parameter(
            "confidence_level",
            confidence_level,
            "must lie strictly between 0 and 1",
        ))
    }
}

/// Validates a time horizon is a positive number of periods.
pub fn validate_horizon(horizon_days: u32) -> AnalyticsResult<()> {
    if horizon_days == 0 {
        return Err(AnalyticsError::invalid_parameter(
            "horizon_days",
            horizon_days,
            "must be a positive number of periods",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kinds() {
        let err = AnalyticsError::invalid_parameter("confidence_level", 1.5, "out of range");
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = AnalyticsError::insufficient_data("historical VaR", 30, 12);
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert!(err.to_string().contains("need at least 30, got 12"));

        let err = AnalyticsError::InvalidTransition {
            from: "Liquidated".into(),
            to: "Healthy".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = AnalyticsError::convergence_failed("target return 0.135890", 50_000, 1.57e-4);
        assert_eq!(err.kind(), ErrorKind::ConvergenceFailed);
        assert_eq!(err.kind().as_str(), "CONVERGENCE_FAILED");
        assert!(err.to_string().contains("50000 iterations"));
        assert!(!err.to_string().contains("Singular"));
    }

    #[test]
    fn test_leverage_error_carries_context() {
        let err = AnalyticsError::LeverageLimitExceeded {
            symbol: Symbol::new("ETH-USD"),
            margin_type: MarginType::Isolated,
            requested: dec!(25),
            limit: dec!(20),
        };
        let msg = err.to_string();
        assert!(msg.contains("ETH-USD"));
        assert!(msg.contains("25"));
        assert!(msg.contains("20"));
        assert_eq!(err.kind().as_str(), "LEVERAGE_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_validate_confidence() {
        assert!(validate_confidence(0.95).is_ok());
        assert!(validate_confidence(0.0).is_err());
        assert!(validate_confidence(1.0).is_err());
        assert!(validate_confidence(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_horizon() {
        assert!(validate_horizon(1).is_ok());
        assert_eq!(
            validate_horizon(0).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
    }
}
