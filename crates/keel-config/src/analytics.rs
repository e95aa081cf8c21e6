//! VaR, optimizer, rebalancing and freshness settings.

use chrono::Duration;
use keel_math::linear_algebra::ShrinkageTarget;
use keel_math::optimization::OptimizationConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Validate, ValidationError};

// =============================================================================
// VAR
// =============================================================================

/// VaR calculator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarConfig {
    /// Fewest observations accepted by historical simulation.
    pub min_historical_observations: usize,
    /// Fewest draws accepted by Monte Carlo simulation.
    pub min_simulations: u32,
    /// Draws per Monte Carlo batch; cancellation is checked between batches.
    pub simulation_batch_size: u32,
    /// Returns fetched per symbol when VaR is computed from live positions.
    pub returns_lookback: usize,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            min_historical_observations: 30,
            min_simulations: 1_000,
            simulation_batch_size: 10_000,
            returns_lookback: 250,
        }
    }
}

impl VarConfig {
    /// Builder method to set the historical observation minimum.
    #[must_use]
    pub fn with_min_historical_observations(mut self, n: usize) -> Self {
        self.min_historical_observations = n;
        self
    }

    /// Builder method to set the simulation minimum.
    #[must_use]
    pub fn with_min_simulations(mut self, n: u32) -> Self {
        self.min_simulations = n;
        self
    }

    /// Builder method to set the batch size.
    #[must_use]
    pub fn with_simulation_batch_size(mut self, n: u32) -> Self {
        self.simulation_batch_size = n;
        self
    }

    /// Builder method to set the lookback used for live positions.
    #[must_use]
    pub fn with_returns_lookback(mut self, n: usize) -> Self {
        self.returns_lookback = n;
        self
    }
}

impl Validate for VarConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.min_historical_observations == 0 {
            errors.push(ValidationError::new(
                "min_historical_observations",
                "must be positive",
            ));
        }
        if self.min_simulations == 0 {
            errors.push(ValidationError::new("min_simulations", "must be positive"));
        }
        if self.simulation_batch_size == 0 {
            errors.push(ValidationError::new(
                "simulation_batch_size",
                "must be positive",
            ));
        }
        if self.returns_lookback < self.min_historical_observations {
            errors.push(ValidationError::new(
                "returns_lookback",
                "must cover min_historical_observations",
            ));
        }
        errors
    }
}

// =============================================================================
// OPTIMIZER
// =============================================================================

/// Mean-variance optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Lower bound on every weight. Negative values permit shorting.
    pub min_weight: f64,
    /// Upper bound on every weight.
    pub max_weight: f64,
    /// Matrix the sample covariance is shrunk toward.
    pub shrinkage_target: ShrinkageTarget,
    /// Shrinkage intensity in `[0, 1]`.
    pub shrinkage_intensity: f64,
    /// Largest eigenvalue ratio accepted after shrinkage.
    pub max_condition_number: f64,
    /// Scale means and covariances to annual figures.
    pub annualize: bool,
    /// Frontier points when the caller does not specify a count.
    pub frontier_points: usize,
    /// Frontier points evaluated by the max-Sharpe grid search.
    pub sharpe_grid_points: usize,
    /// Golden-section iterations refining the max-Sharpe grid optimum.
    pub sharpe_refinement_iterations: u32,
    /// Minimum number of frontier points before the sweep runs in parallel.
    pub parallel_threshold: usize,
    /// Decimal places of reported weights.
    pub weight_decimal_places: u32,
    /// QP solver settings.
    pub solver: OptimizationConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.0,
            max_weight: 1.0,
            shrinkage_target: ShrinkageTarget::Diagonal,
            shrinkage_intensity: 0.1,
            max_condition_number: 1e10,
            annualize: true,
            frontier_points: 20,
            sharpe_grid_points: 40,
            sharpe_refinement_iterations: 60,
            parallel_threshold: 4,
            weight_decimal_places: 10,
            solver: OptimizationConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Long-only configuration with the given upper bound per asset.
    pub fn long_only(max_weight: f64) -> Self {
        Self {
            max_weight,
            ..Self::default()
        }
    }

    /// Builder method to set weight bounds.
    #[must_use]
    pub fn with_bounds(mut self, min_weight: f64, max_weight: f64) -> Self {
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self
    }

    /// Builder method to set shrinkage.
    #[must_use]
    pub fn with_shrinkage(mut self, target: ShrinkageTarget, intensity: f64) -> Self {
        self.shrinkage_target = target;
        self.shrinkage_intensity = intensity;
        self
    }

    /// Builder method to toggle annualization.
    #[must_use]
    pub fn with_annualize(mut self, annualize: bool) -> Self {
        self.annualize = annualize;
        self
    }

    /// Returns true if negative weights are permitted.
    pub fn allows_short(&self) -> bool {
        self.min_weight < 0.0
    }

    /// Returns true if a sweep of `points` should run on the thread pool.
    pub fn should_parallelize(&self, points: usize) -> bool {
        points >= self.parallel_threshold
    }
}

impl Validate for OptimizerConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(self.min_weight.is_finite() && self.max_weight.is_finite())
            || self.min_weight > self.max_weight
        {
            errors.push(ValidationError::with_rule(
                "min_weight",
                format!(
                    "bounds [{}, {}] are not a finite interval",
                    self.min_weight, self.max_weight
                ),
                "ordered_bounds",
            ));
        }
        if self.max_weight <= 0.0 {
            errors.push(ValidationError::new("max_weight", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.shrinkage_intensity) {
            errors.push(ValidationError::new(
                "shrinkage_intensity",
                "must lie in [0, 1]",
            ));
        }
        if !(self.max_condition_number > 1.0) {
            errors.push(ValidationError::new(
                "max_condition_number",
                "must exceed 1",
            ));
        }
        if self.frontier_points == 0 {
            errors.push(ValidationError::new("frontier_points", "must be positive"));
        }
        if self.sharpe_grid_points < 3 {
            errors.push(ValidationError::new(
                "sharpe_grid_points",
                "need at least 3 points",
            ));
        }
        if self.weight_decimal_places == 0 || self.weight_decimal_places > 18 {
            errors.push(ValidationError::new(
                "weight_decimal_places",
                "must lie in [1, 18]",
            ));
        }
        if !(self.solver.tolerance > 0.0) || self.solver.max_iterations == 0 {
            errors.push(ValidationError::new(
                "solver",
                "tolerance and iteration limit must be positive",
            ));
        }
        errors
    }
}

// =============================================================================
// REBALANCE
// =============================================================================

/// Rebalancer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Trades smaller than this value are skipped. `None` trades everything.
    pub min_trade_value: Option<Decimal>,
    /// Accept negative target weights.
    pub allow_short: bool,
    /// Allowed deviation of the target weight sum from one.
    pub weight_tolerance: Decimal,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            min_trade_value: None,
            allow_short: false,
            weight_tolerance: Decimal::new(1, 6),
        }
    }
}

impl RebalanceConfig {
    /// Builder method to set the trade band.
    #[must_use]
    pub fn with_min_trade_value(mut self, value: Decimal) -> Self {
        self.min_trade_value = Some(value);
        self
    }

    /// Builder method to allow shorting.
    #[must_use]
    pub fn with_allow_short(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }
}

impl Validate for RebalanceConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.min_trade_value.is_some_and(|v| v < Decimal::ZERO) {
            errors.push(ValidationError::new(
                "min_trade_value",
                "must not be negative",
            ));
        }
        if self.weight_tolerance < Decimal::ZERO {
            errors.push(ValidationError::new(
                "weight_tolerance",
                "must not be negative",
            ));
        }
        errors
    }
}

// =============================================================================
// FRESHNESS
// =============================================================================

/// Maximum snapshot ages accepted from collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// Maximum age of a return series, measured from its last observation.
    pub max_returns_age_seconds: i64,
    /// Maximum age of a position snapshot.
    pub max_positions_age_seconds: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_returns_age_seconds: 3 * 24 * 60 * 60,
            max_positions_age_seconds: 5 * 60,
        }
    }
}

impl FreshnessConfig {
    /// Maximum return-series age.
    pub fn max_returns_age(&self) -> Duration {
        Duration::seconds(self.max_returns_age_seconds)
    }

    /// Maximum position-snapshot age.
    pub fn max_positions_age(&self) -> Duration {
        Duration::seconds(self.max_positions_age_seconds)
    }
}

impl Validate for FreshnessConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.max_returns_age_seconds <= 0 {
            errors.push(ValidationError::new(
                "max_returns_age_seconds",
                "must be positive",
            ));
        }
        if self.max_positions_age_seconds <= 0 {
            errors.push(ValidationError::new(
                "max_positions_age_seconds",
                "must be positive",
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(VarConfig::default().is_valid());
        assert!(OptimizerConfig::default().is_valid());
        assert!(RebalanceConfig::default().is_valid());
        assert!(FreshnessConfig::default().is_valid());
    }

    #[test]
    fn test_optimizer_bounds() {
        assert!(!OptimizerConfig::default().allows_short());
        let shorting = OptimizerConfig::default().with_bounds(-0.5, 1.5);
        assert!(shorting.allows_short());
        assert!(shorting.is_valid());

        let inverted = OptimizerConfig::default().with_bounds(0.6, 0.4);
        assert!(!inverted.is_valid());

        let bad_shrink = OptimizerConfig::default().with_shrinkage(ShrinkageTarget::Diagonal, 1.5);
        assert!(!bad_shrink.is_valid());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{ "max_weight": 0.4, "shrinkage_target": "scaled_identity" }"#)
                .unwrap();
        assert!((config.max_weight - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.shrinkage_target, ShrinkageTarget::ScaledIdentity);
        assert_eq!(config.frontier_points, 20);
    }

    #[test]
    fn test_freshness_durations() {
        let config = FreshnessConfig::default();
        assert_eq!(config.max_positions_age(), Duration::minutes(5));
        assert_eq!(config.max_returns_age(), Duration::days(3));
    }
}
