//! # Keel Core
//!
//! Core types, error taxonomy, and cooperative-cancellation primitives for the
//! Keel risk and portfolio analytics engine.
//!
//! This crate provides the foundational building blocks used throughout Keel:
//!
//! - **Types**: `Symbol`, `ReturnSeries`, `Position`, `Portfolio`, `Weights`
//! - **Errors**: The machine-checkable analytics error taxonomy ([`ErrorKind`])
//! - **Cancellation**: [`CancellationToken`] checked between batches of long work
//! - **Freshness**: Staleness checks for collaborator snapshots
//!
//! ## Design Philosophy
//!
//! - **Decimal Money**: Monetary amounts and weights are `rust_decimal::Decimal`
//! - **Snapshots In, Results Out**: Nothing here owns shared mutable state
//! - **Fail Loudly**: Errors are never downgraded to default values
//!
//! ## Example
//!
//! ```rust
//! use keel_core::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let position = Position::builder("BTC-USD")
//!     .quantity(dec!(2))
//!     .entry_price(dec!(50000))
//!     .current_price(dec!(52000))
//!     .leverage(dec!(5))
//!     .collateral(dec!(20000))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(position.unrealized_pnl(), dec!(4000));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod cancel;
pub mod error;
pub mod freshness;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::error::{AnalyticsError, AnalyticsResult, ErrorKind};
    pub use crate::freshness::ensure_fresh;
    pub use crate::types::{
        MarginType, Portfolio, Position, PositionBuilder, PositionSide, ReturnSeries,
        SamplingFrequency, Symbol, Weights,
    };
}

// Re-export commonly used types at crate root
pub use cancel::CancellationToken;
pub use error::{AnalyticsError, AnalyticsResult, ErrorKind};
pub use types::{
    MarginType, Portfolio, Position, PositionSide, ReturnSeries, SamplingFrequency, Symbol,
    Weights,
};
