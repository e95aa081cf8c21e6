//! # Keel Portfolio
//!
//! Portfolio-level analytics for the Keel risk engine.
//!
//! This crate provides:
//!
//! - **Estimates**: Expected returns and shrunk covariance from return series
//! - **Optimizer**: Efficient frontier, minimum-variance and maximum-Sharpe portfolios
//! - **Rebalancer**: Signed value deltas from current holdings to target weights
//! - **Stress Testing**: Price-shock scenarios applied to position snapshots
//!
//! ## Design Philosophy
//!
//! - **Pure Functions**: Inputs are snapshots; nothing is cached or mutated
//! - **Decimal Weights**: Optimizer output is converted to `Decimal` summing to exactly one
//! - **Deterministic Parallelism**: Frontier points and stress scenarios may run
//!   on the rayon pool but are always returned in a fixed order
//!
//! ## Example
//!
//! ```rust
//! use keel_config::RebalanceConfig;
//! use keel_portfolio::prelude::*;
//! use keel_core::{Symbol, Weights};
//! use rust_decimal_macros::dec;
//!
//! let current: Weights = [(Symbol::new("BTC"), dec!(0.6)), (Symbol::new("ETH"), dec!(0.4))]
//!     .into_iter()
//!     .collect();
//! let target: Weights = [(Symbol::new("BTC"), dec!(0.5)), (Symbol::new("ETH"), dec!(0.5))]
//!     .into_iter()
//!     .collect();
//!
//! let plan = Rebalancer::new(RebalanceConfig::default())
//!     .from_weights(&current, &target, dec!(100000))
//!     .unwrap();
//! assert_eq!(plan.turnover, dec!(20000));
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
#![allow(clippy::similar_names)]
#![allow(clippy::uninlined_format_args)]

pub mod estimates;
pub mod optimizer;
pub mod parallel;
pub mod rebalance;
pub mod stress;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::estimates::MarketEstimates;
    pub use crate::optimizer::{
        EfficientFrontierPoint, PortfolioOptimizationResult, PortfolioOptimizer,
    };
    pub use crate::rebalance::{RebalancePlan, RebalanceTrade, Rebalancer, TradeSide};
    pub use crate::stress::{
        best_case, run_stress_scenario, run_stress_scenarios, standard, summarize_results,
        worst_case, StressResult, StressScenario, StressSummary,
    };
}

// Re-export commonly used types at crate root
pub use estimates::MarketEstimates;
pub use optimizer::{EfficientFrontierPoint, PortfolioOptimizationResult, PortfolioOptimizer};
pub use parallel::try_maybe_parallel_map;
pub use rebalance::{RebalancePlan, RebalanceTrade, Rebalancer, TradeSide};
pub use stress::{StressResult, StressScenario, StressSummary};
