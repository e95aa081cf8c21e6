//! # Keel Engine
//!
//! The risk engine facade for Keel.
//!
//! This crate provides:
//! - [`RiskEngine`]: VaR, optimization, rebalancing, stress testing, leverage,
//!   debt and margin monitoring over injected collaborators
//! - [`RiskEngineBuilder`]: Wires return series, positions, margin
//!   configuration and settings into an engine
//! - [`InMemorySource`]: Collaborator implementation for tests and tooling
//!
//! ## Architecture
//!
//! ```text
//! ReturnSeriesSource ─┐
//! PositionSource ─────┼─> RiskEngine ─┬─> keel-var       ─> VaRResult
//! MarginConfigSource ─┘       │       ├─> keel-portfolio ─> frontier, trades, stress P&L
//!                         ConfigStore └─> keel-margin    ─> LeverageInfo, DebtSummary
//! ```
//!
//! Collaborator calls are awaited once at the start of each request. The
//! numeric work then runs on tokio's blocking pool so async callers are not
//! stalled by Monte Carlo runs or frontier sweeps.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use keel_core::{CancellationToken, Position, ReturnSeries, SamplingFrequency};
//! use keel_engine::{InMemorySource, RiskEngineBuilder};
//! use keel_var::{VaRMethod, VaRRequest};
//! use rust_decimal_macros::dec;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = Arc::new(InMemorySource::default());
//! let returns: Vec<f64> = (0..60).map(|i| ((i * 7 % 11) as f64 - 5.0) / 250.0).collect();
//! source.insert_series(ReturnSeries::new("BTC-USD", returns, SamplingFrequency::Daily));
//! source.insert_position(
//!     Position::builder("BTC-USD")
//!         .quantity(dec!(2))
//!         .entry_price(dec!(50000))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let engine = RiskEngineBuilder::new().with_sources(source).build().unwrap();
//! let request = VaRRequest::new(0.95, 1, dec!(100000), VaRMethod::Historical);
//! let result = engine
//!     .calculate_var(request, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert!(result.cvar >= result.var);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod error;
pub mod memory;

// Re-exports
pub use builder::RiskEngineBuilder;
pub use engine::{MarginStatus, RiskEngine};
pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use memory::InMemorySource;
