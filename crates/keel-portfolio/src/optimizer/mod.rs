//! Mean-variance portfolio optimization.
//!
//! Every portfolio here solves
//!
//! ```text
//! minimize    ½ wᵀ Σ w
//! subject to  Σ w = 1
//!             μ · w = target      (frontier points only)
//!             lower ≤ w ≤ upper
//! ```
//!
//! The frontier spans target returns from the minimum-variance portfolio up
//! to the highest return the bounds allow. Both ends are solved directly: the
//! top target is a vertex of the feasible set, where the return constraint
//! leaves no room for the solver to move. Max-Sharpe searches that range on
//! a grid and refines the best cell by golden-section search.

mod types;
mod weights;

pub use types::{EfficientFrontierPoint, PortfolioOptimizationResult};

use keel_config::OptimizerConfig;
use keel_core::{AnalyticsError, AnalyticsResult, CancellationToken};
use keel_math::optimization::{golden_section_max, solve_qp, QpProblem};
use keel_math::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::estimates::MarketEstimates;
use crate::parallel::try_maybe_parallel_map;
use weights::{round_weights, weight_vector};

/// Relative width below which the frontier return range is treated as a point.
const DEGENERATE_RANGE: f64 = 1e-12;

/// Relative gap below which two expected returns count as equal.
const RETURN_TIE: f64 = 1e-12;

/// Slack below which a weight counts as sitting on its bound.
const BOUND_SLACK: f64 = 1e-12;

/// A frontier target return. The two ends are known portfolios.
#[derive(Debug, Clone, Copy)]
struct GridPoint {
    target: f64,
    end: Option<GridEnd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridEnd {
    MinVariance,
    MaxReturn,
}

/// Mean-variance optimizer.
///
/// # Example
///
/// ```rust
/// use keel_config::OptimizerConfig;
/// use keel_core::{CancellationToken, Symbol};
/// use keel_portfolio::{MarketEstimates, PortfolioOptimizer};
/// use nalgebra::DMatrix;
/// use rust_decimal::Decimal;
///
/// let config = OptimizerConfig::default().with_shrinkage(Default::default(), 0.0);
/// let estimates = MarketEstimates::from_parts(
///     vec![Symbol::new("BTC"), Symbol::new("ETH")],
///     vec![0.10, 0.20],
///     DMatrix::from_row_slice(2, 2, &[0.04, 0.006, 0.006, 0.09]),
///     &config,
/// )
/// .unwrap();
///
/// let optimizer = PortfolioOptimizer::new(config);
/// let min_var = optimizer.min_variance(&estimates).unwrap();
/// assert_eq!(min_var.weights.sum(), Decimal::ONE);
///
/// let frontier = optimizer
///     .efficient_frontier(&estimates, 5, &CancellationToken::new())
///     .unwrap();
/// assert_eq!(frontier.len(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    /// Creates an optimizer with the given settings.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// The portfolio with the lowest risk, regardless of return.
    ///
    /// Its Sharpe ratio is reported against a zero risk-free rate.
    pub fn min_variance(
        &self,
        estimates: &MarketEstimates,
    ) -> AnalyticsResult<PortfolioOptimizationResult> {
        self.check_feasible(estimates)?;
        let x = self.solve_min_variance(estimates)?;
        self.finish(estimates, &x, 0.0)
    }

    /// `points` frontier portfolios ordered by increasing risk.
    ///
    /// Target returns are evenly spaced from the minimum-variance return to the
    /// highest return reachable under the bounds. When every asset has the same
    /// expected return the frontier is the single minimum-variance point.
    /// Cancellation is checked before each point.
    pub fn efficient_frontier(
        &self,
        estimates: &MarketEstimates,
        points: usize,
        cancel: &CancellationToken,
    ) -> AnalyticsResult<Vec<EfficientFrontierPoint>> {
        self.efficient_frontier_with_progress(estimates, points, cancel, |_| {})
    }

    /// [`efficient_frontier`](Self::efficient_frontier), calling `progress`
    /// with the number of points solved so far after each point.
    ///
    /// Points solved in parallel report in completion order.
    pub fn efficient_frontier_with_progress<P>(
        &self,
        estimates: &MarketEstimates,
        points: usize,
        cancel: &CancellationToken,
        progress: P,
    ) -> AnalyticsResult<Vec<EfficientFrontierPoint>>
    where
        P: Fn(usize) + Sync + Send,
    {
        if points == 0 {
            return Err(AnalyticsError::invalid_parameter(
                "points",
                points,
                "frontier needs at least one point",
            ));
        }
        self.check_feasible(estimates)?;
        cancel.check("efficient frontier")?;

        let min_var = self.solve_min_variance(estimates)?;
        let top = self.max_return_portfolio(estimates)?;
        let Some(targets) = self.target_grid(estimates, &min_var, &top, points) else {
            let point = self.finish(estimates, &min_var, 0.0)?.to_frontier_point();
            progress(1);
            return Ok(vec![point]);
        };

        let solved = AtomicUsize::new(0);
        let mut frontier = try_maybe_parallel_map(
            &targets,
            self.config.parallel_threshold,
            |target| -> AnalyticsResult<EfficientFrontierPoint> {
                cancel.check("efficient frontier")?;
                let x = self.solve_grid_point(estimates, target, &min_var, &top)?;
                let point = self.finish(estimates, &x, 0.0)?.to_frontier_point();
                progress(solved.fetch_add(1, Ordering::Relaxed) + 1);
                Ok(point)
            },
        )?;

        frontier.sort_by(|a, b| {
            a.risk
                .total_cmp(&b.risk)
                .then_with(|| a.weights.concentration().cmp(&b.weights.concentration()))
        });
        log::debug!(
            "frontier of {} points, risk {:.6}..{:.6}",
            frontier.len(),
            frontier.first().map_or(0.0, |p| p.risk),
            frontier.last().map_or(0.0, |p| p.risk)
        );
        Ok(frontier)
    }

    /// The portfolio maximizing `(return - risk_free_rate) / risk`.
    pub fn max_sharpe(
        &self,
        estimates: &MarketEstimates,
        risk_free_rate: f64,
        cancel: &CancellationToken,
    ) -> AnalyticsResult<PortfolioOptimizationResult> {
        if !risk_free_rate.is_finite() {
            return Err(AnalyticsError::invalid_parameter(
                "risk_free_rate",
                risk_free_rate,
                "must be finite",
            ));
        }
        self.check_feasible(estimates)?;
        cancel.check("max sharpe")?;

        let min_var = self.solve_min_variance(estimates)?;
        let top = self.max_return_portfolio(estimates)?;
        let Some(targets) =
            self.target_grid(estimates, &min_var, &top, self.config.sharpe_grid_points)
        else {
            return self.finish_sharpe(estimates, &min_var, risk_free_rate);
        };

        let sharpe_at = |x: &DVector<f64>| -> Option<f64> {
            let risk = estimates.portfolio_risk(x);
            (risk > 0.0).then(|| (estimates.portfolio_return(x) - risk_free_rate) / risk)
        };

        let grid = try_maybe_parallel_map(
            &targets,
            self.config.parallel_threshold,
            |target| -> AnalyticsResult<DVector<f64>> {
                cancel.check("max sharpe")?;
                self.solve_grid_point(estimates, target, &min_var, &top)
            },
        )?;

        let best = grid
            .iter()
            .enumerate()
            .filter_map(|(i, x)| sharpe_at(x).map(|s| (i, s)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .ok_or_else(|| {
                AnalyticsError::invalid_parameter(
                    "risk",
                    0,
                    "no frontier portfolio has positive risk",
                )
            })?;

        // Points the solver cannot reach score as -inf; the grid already holds
        // the exact endpoints.
        cancel.check("max sharpe")?;
        let lo = targets[best.saturating_sub(1)].target;
        let hi = targets[(best + 1).min(targets.len() - 1)].target;
        let (target, _) = golden_section_max(
            |t| match self.solve_target_raw(estimates, t) {
                Ok(x) => Ok(sharpe_at(&x).unwrap_or(f64::NEG_INFINITY)),
                Err(MathError::ConvergenceFailed { .. }) => Ok(f64::NEG_INFINITY),
                Err(e) => Err(e),
            },
            lo,
            hi,
            (hi - lo).abs() * 1e-9,
            self.config.sharpe_refinement_iterations,
        )?;

        let grid_best = &grid[best];
        let x = match self.solve_target_raw(estimates, target) {
            Ok(refined) if sharpe_at(&refined) >= sharpe_at(grid_best) => refined,
            Ok(_) | Err(MathError::ConvergenceFailed { .. }) => grid_best.clone(),
            Err(e) => return Err(e.into()),
        };
        self.finish_sharpe(estimates, &x, risk_free_rate)
    }

    // =========================================================================
    // Solving
    // =========================================================================

    fn check_feasible(&self, estimates: &MarketEstimates) -> AnalyticsResult<()> {
        if estimates.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "symbols",
                "[]",
                "empty symbol universe",
            ));
        }
        let n = estimates.len() as f64;
        let (lo, hi) = (self.config.min_weight, self.config.max_weight);
        if lo > hi || n * lo > 1.0 + 1e-12 || n * hi < 1.0 - 1e-12 {
            return Err(AnalyticsError::invalid_parameter(
                "weight bounds",
                format!("[{lo}, {hi}]"),
                format!(
                    "no portfolio of {} assets can sum to 1 within these bounds",
                    estimates.len()
                ),
            ));
        }
        Ok(())
    }

    fn base_problem(&self, estimates: &MarketEstimates) -> MathResult<QpProblem> {
        let ones = vec![1.0; estimates.len()];
        QpProblem::new(estimates.covariance.clone())?
            .with_equality(&ones, 1.0)?
            .with_uniform_bounds(self.config.min_weight, self.config.max_weight)
    }

    fn solve_min_variance(&self, estimates: &MarketEstimates) -> AnalyticsResult<DVector<f64>> {
        let problem = self.base_problem(estimates)?;
        Ok(solve_qp(&problem, &self.config.solver)?.x)
    }

    fn solve_target_raw(&self, estimates: &MarketEstimates, target: f64) -> MathResult<DVector<f64>> {
        let problem = self
            .base_problem(estimates)?
            .with_equality(estimates.expected_returns.as_slice(), target)?;
        Ok(solve_qp(&problem, &self.config.solver)?.x)
    }

    fn solve_for_target(
        &self,
        estimates: &MarketEstimates,
        target: f64,
    ) -> AnalyticsResult<DVector<f64>> {
        self.solve_target_raw(estimates, target).map_err(|e| match e {
            MathError::ConvergenceFailed {
                iterations,
                residual,
            } => AnalyticsError::convergence_failed(
                format!("target return {target:.6}"),
                iterations,
                residual,
            ),
            other => other.into(),
        })
    }

    fn solve_grid_point(
        &self,
        estimates: &MarketEstimates,
        point: &GridPoint,
        min_var: &DVector<f64>,
        top: &DVector<f64>,
    ) -> AnalyticsResult<DVector<f64>> {
        match point.end {
            Some(GridEnd::MinVariance) => Ok(min_var.clone()),
            Some(GridEnd::MaxReturn) => Ok(top.clone()),
            None => self.solve_for_target(estimates, point.target),
        }
    }

    /// The portfolio with the highest expected return the bounds allow.
    ///
    /// Best-returning assets are filled to the upper bound first. When
    /// several assets tie with the one that takes the remainder, the
    /// remainder is split among them at minimum variance; otherwise the
    /// fill is the only portfolio with that return.
    fn max_return_portfolio(&self, estimates: &MarketEstimates) -> AnalyticsResult<DVector<f64>> {
        let n = estimates.len();
        let (lo, hi) = (self.config.min_weight, self.config.max_weight);
        let mu = &estimates.expected_returns;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| mu[b].total_cmp(&mu[a]));

        let mut x = DVector::from_element(n, lo);
        let mut remaining = 1.0 - lo * n as f64;
        for &i in &order {
            let extra = remaining.clamp(0.0, hi - lo);
            remaining -= extra;
            x[i] += extra;
        }

        let Some(&marginal) = order.iter().find(|&&i| x[i] < hi - BOUND_SLACK) else {
            return Ok(x);
        };
        let level = mu[marginal];
        let tied: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| (mu[i] - level).abs() <= RETURN_TIE * level.abs().max(1.0))
            .collect();
        let k = tied.len() as f64;
        let budget: f64 = tied.iter().map(|&i| x[i]).sum();
        if tied.len() < 2 || budget <= k * lo + BOUND_SLACK || budget >= k * hi - BOUND_SLACK {
            return Ok(x);
        }

        let cov = &estimates.covariance;
        let sub_cov = DMatrix::from_fn(tied.len(), tied.len(), |r, c| cov[(tied[r], tied[c])]);
        let cross: Vec<f64> = tied
            .iter()
            .map(|&i| {
                (0..n)
                    .filter(|j| !tied.contains(j))
                    .map(|j| cov[(i, j)] * x[j])
                    .sum()
            })
            .collect();
        let problem = QpProblem::new(sub_cov)?
            .with_linear(&cross)?
            .with_equality(&vec![1.0; tied.len()], budget)?
            .with_uniform_bounds(lo, hi)?;
        let split = solve_qp(&problem, &self.config.solver)?;
        for (r, &i) in tied.iter().enumerate() {
            x[i] = split.x[r];
        }
        Ok(x)
    }

    /// Evenly spaced target returns, or `None` when the range is degenerate.
    fn target_grid(
        &self,
        estimates: &MarketEstimates,
        min_var: &DVector<f64>,
        top: &DVector<f64>,
        points: usize,
    ) -> Option<Vec<GridPoint>> {
        let low = estimates.portfolio_return(min_var);
        let high = estimates.portfolio_return(top);
        let width = high - low;
        if points < 2 || width <= DEGENERATE_RANGE * low.abs().max(high.abs()).max(1.0) {
            return None;
        }
        let step = width / (points - 1) as f64;
        let last = points - 1;
        Some(
            (0..points)
                .map(|i| GridPoint {
                    target: if i == last { high } else { low + step * i as f64 },
                    end: match i {
                        0 => Some(GridEnd::MinVariance),
                        i if i == last => Some(GridEnd::MaxReturn),
                        _ => None,
                    },
                })
                .collect(),
        )
    }


    // =========================================================================
    // Results
    // =========================================================================

    fn finish(
        &self,
        estimates: &MarketEstimates,
        x: &DVector<f64>,
        risk_free_rate: f64,
    ) -> AnalyticsResult<PortfolioOptimizationResult> {
        let weights = round_weights(
            &estimates.symbols,
            x,
            self.config.weight_decimal_places,
            self.config.min_weight,
            self.config.max_weight,
        )?;
        let w = weight_vector(&estimates.symbols, &weights);
        let expected_return = estimates.portfolio_return(&w);
        let risk = estimates.portfolio_risk(&w);
        let sharpe_ratio = if risk > 0.0 {
            (expected_return - risk_free_rate) / risk
        } else {
            0.0
        };

        Ok(PortfolioOptimizationResult {
            weights,
            expected_return,
            risk,
            sharpe_ratio,
            risk_free_rate,
        })
    }

    fn finish_sharpe(
        &self,
        estimates: &MarketEstimates,
        x: &DVector<f64>,
        risk_free_rate: f64,
    ) -> AnalyticsResult<PortfolioOptimizationResult> {
        let result = self.finish(estimates, x, risk_free_rate)?;
        if result.risk <= 0.0 {
            return Err(AnalyticsError::invalid_parameter(
                "risk",
                result.risk,
                "no frontier portfolio has positive risk",
            ));
        }
        Ok(result)
    }
}
