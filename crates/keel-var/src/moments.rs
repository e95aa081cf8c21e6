//! Return moments and portfolio return aggregation.

use keel_core::{AnalyticsError, AnalyticsResult, ReturnSeries, Weights};
use keel_math::statistics;
use nalgebra::{DMatrix, DVector};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Mean and volatility of one-period returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnMoments {
    /// Mean periodic return.
    pub mean: f64,
    /// Standard deviation of periodic returns.
    pub volatility: f64,
}

impl ReturnMoments {
    /// Creates moments, rejecting negative or non-finite inputs.
    pub fn new(mean: f64, volatility: f64) -> AnalyticsResult<Self> {
        if !mean.is_finite() {
            return Err(AnalyticsError::invalid_parameter("mean", mean, "must be finite"));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(AnalyticsError::invalid_parameter(
                "volatility",
                volatility,
                "must be finite and non-negative",
            ));
        }
        Ok(Self { mean, volatility })
    }

    /// Sample mean and standard deviation of a return series.
    pub fn from_returns(returns: &[f64]) -> AnalyticsResult<Self> {
        if returns.len() < 2 {
            return Err(AnalyticsError::insufficient_data(
                "return moments",
                2,
                returns.len(),
            ));
        }
        Self::new(statistics::mean(returns)?, statistics::std_dev(returns)?)
    }

    /// Moments of a weighted portfolio: `w·μ` and `sqrt(wᵀΣw)`.
    pub fn from_weights(
        weights: &[f64],
        means: &[f64],
        covariance: &DMatrix<f64>,
    ) -> AnalyticsResult<Self> {
        let n = weights.len();
        if n == 0 || means.len() != n || covariance.nrows() != n || covariance.ncols() != n {
            return Err(AnalyticsError::invalid_parameter(
                "weights",
                n,
                format!(
                    "dimension mismatch: {} weights, {} means, {}x{} covariance",
                    n,
                    means.len(),
                    covariance.nrows(),
                    covariance.ncols()
                ),
            ));
        }
        let w = DVector::from_column_slice(weights);
        let mean = w.dot(&DVector::from_column_slice(means));
        let variance = w.dot(&(covariance * &w));
        // Rounding can push a zero variance slightly negative
        Self::new(mean, variance.max(0.0).sqrt())
    }
}

/// Aggregates per-symbol returns into one weighted portfolio return series.
///
/// Series are aligned on their most recent observations and truncated to the
/// shortest length. Every weighted symbol must have a series.
pub fn portfolio_return_series(
    series: &[ReturnSeries],
    weights: &Weights,
) -> AnalyticsResult<Vec<f64>> {
    if weights.is_empty() {
        return Err(AnalyticsError::invalid_parameter(
            "weights",
            "{}",
            "empty symbol universe",
        ));
    }

    let mut columns = Vec::with_capacity(weights.len());
    for (symbol, weight) in weights {
        let s = series.iter().find(|s| &s.symbol == symbol).ok_or_else(|| {
            AnalyticsError::insufficient_data(format!("return series for {symbol}"), 1, 0)
        })?;
        s.ensure_usable(1, "portfolio returns")?;
        let w = weight.to_f64().ok_or_else(|| {
            AnalyticsError::invalid_parameter("weight", weight, "not representable as f64")
        })?;
        columns.push((w, s.returns.as_slice()));
    }

    let len = columns.iter().map(|(_, r)| r.len()).min().unwrap_or(0);
    let aggregated = (0..len)
        .map(|t| {
            columns
                .iter()
                .map(|(w, r)| w * r[r.len() - len + t])
                .sum::<f64>()
        })
        .collect();
    Ok(aggregated)
}
