//! VaR request and result types.

use chrono::{DateTime, Utc};
use keel_core::error::{validate_confidence, validate_horizon};
use keel_core::{AnalyticsError, AnalyticsResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distribution of simulated one-period returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationDistribution {
    /// Normal with the input mean and volatility.
    #[default]
    Normal,
    /// Student-t rescaled to the input volatility (fat tails).
    StudentT {
        /// Degrees of freedom; must exceed 2 for a finite variance.
        degrees_of_freedom: f64,
    },
}

/// Monte Carlo inputs. Seed and count are explicit so runs are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParams {
    /// Number of simulated returns.
    pub simulations: u32,
    /// Seed of the random generator.
    pub seed: u64,
    /// Distribution of the draws.
    #[serde(default)]
    pub distribution: SimulationDistribution,
}

impl MonteCarloParams {
    /// Normal draws with the given count and seed.
    #[must_use]
    pub fn new(simulations: u32, seed: u64) -> Self {
        Self {
            simulations,
            seed,
            distribution: SimulationDistribution::Normal,
        }
    }

    /// Sets the draw distribution.
    #[must_use]
    pub fn with_distribution(mut self, distribution: SimulationDistribution) -> Self {
        self.distribution = distribution;
        self
    }
}

/// Estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VaRMethod {
    /// Historical simulation over observed returns.
    Historical,
    /// Variance-covariance under a normal assumption.
    Parametric,
    /// Simulated returns.
    MonteCarlo(MonteCarloParams),
}

impl VaRMethod {
    /// Short identifier of the method.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Parametric => "parametric",
            Self::MonteCarlo(_) => "monte_carlo",
        }
    }
}

impl fmt::Display for VaRMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A VaR/CVaR request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VaRRequest {
    /// Confidence level in (0, 1), e.g. 0.95.
    pub confidence_level: f64,
    /// Horizon in return periods.
    pub horizon_days: u32,
    /// Value the loss is expressed against.
    pub portfolio_value: Decimal,
    /// Estimation method.
    pub method: VaRMethod,
}

impl VaRRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(
        confidence_level: f64,
        horizon_days: u32,
        portfolio_value: Decimal,
        method: VaRMethod,
    ) -> Self {
        Self {
            confidence_level,
            horizon_days,
            portfolio_value,
            method,
        }
    }

    /// Checks confidence, horizon and portfolio value.
    pub fn validate(&self) -> AnalyticsResult<()> {
        validate_confidence(self.confidence_level)?;
        validate_horizon(self.horizon_days)?;
        if self.portfolio_value <= Decimal::ZERO {
            return Err(AnalyticsError::invalid_parameter(
                "portfolio_value",
                self.portfolio_value,
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Value at Risk result.
///
/// Both amounts are non-negative losses and `cvar >= var`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaRResult {
    /// The VaR value (absolute loss).
    pub var: Decimal,
    /// Conditional VaR: mean loss in the tail beyond VaR.
    pub cvar: Decimal,
    /// Confidence level (e.g., 0.95 for 95%).
    pub confidence_level: f64,
    /// Time horizon in periods.
    pub horizon_days: u32,
    /// Method used for calculation.
    pub method: VaRMethod,
    /// Observations or simulations behind the estimate.
    pub sample_size: usize,
    /// When the result was computed.
    pub computed_at: DateTime<Utc>,
}

impl fmt::Display for VaRResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VaR({:.0}%, {}d, {}): ${:.2}, CVaR: ${:.2}",
            self.confidence_level * 100.0,
            self.horizon_days,
            self.method,
            self.var,
            self.cvar
        )
    }
}
