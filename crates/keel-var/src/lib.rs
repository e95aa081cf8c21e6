//! # Keel VaR
//!
//! Value at Risk and Conditional VaR for the Keel risk engine.
//!
//! Three estimation methods are selected per request through [`VaRMethod`]:
//!
//! - **Historical**: Empirical percentile of observed returns
//! - **Parametric**: Normal quantile of the mean and volatility
//! - **Monte Carlo**: Empirical percentile of seeded simulated returns
//!
//! Every method computes a one-period loss and scales it to the horizon with
//! the square-root-of-time rule. Losses are reported as non-negative
//! `Decimal` amounts rounded to cents, with CVaR never below VaR.
//!
//! ## Example
//!
//! ```rust
//! use keel_core::CancellationToken;
//! use keel_var::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let calculator = VaRCalculator::default();
//! let request = VaRRequest::new(
//!     0.99,
//!     10,
//!     dec!(1000000),
//!     VaRMethod::MonteCarlo(MonteCarloParams::new(20_000, 42)),
//! );
//! let moments = ReturnMoments::new(0.0, 0.01).unwrap();
//!
//! let result = calculator
//!     .calculate_from_moments(&request, moments, &CancellationToken::new())
//!     .unwrap();
//! assert!(result.cvar >= result.var);
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
#![allow(clippy::uninlined_format_args)]

pub mod calculator;
pub mod historical;
pub mod moments;
pub mod monte_carlo;
pub mod parametric;
pub mod tail;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calculator::VaRCalculator;
    pub use crate::moments::{portfolio_return_series, ReturnMoments};
    pub use crate::tail::TailLoss;
    pub use crate::types::{
        MonteCarloParams, SimulationDistribution, VaRMethod, VaRRequest, VaRResult,
    };
}

pub use calculator::VaRCalculator;
pub use moments::{portfolio_return_series, ReturnMoments};
pub use types::{MonteCarloParams, SimulationDistribution, VaRMethod, VaRRequest, VaRResult};
