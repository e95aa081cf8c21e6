//! Optimizer result types.

use keel_core::Weights;
use serde::{Deserialize, Serialize};

/// One point of the efficient frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontierPoint {
    /// Expected portfolio return.
    pub expected_return: f64,
    /// Portfolio standard deviation.
    pub risk: f64,
    /// Weights summing to one, within the configured bounds.
    pub weights: Weights,
}

/// An optimized portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioOptimizationResult {
    /// Weights summing to one, within the configured bounds.
    pub weights: Weights,
    /// Expected portfolio return.
    pub expected_return: f64,
    /// Portfolio standard deviation.
    pub risk: f64,
    /// `(expected_return - risk_free_rate) / risk`.
    pub sharpe_ratio: f64,
    /// Risk-free rate used for the Sharpe ratio.
    pub risk_free_rate: f64,
}

impl PortfolioOptimizationResult {
    /// Frontier point view of this portfolio.
    #[must_use]
    pub fn to_frontier_point(&self) -> EfficientFrontierPoint {
        EfficientFrontierPoint {
            expected_return: self.expected_return,
            risk: self.risk,
            weights: self.weights.clone(),
        }
    }
}
