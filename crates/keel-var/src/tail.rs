//! Empirical tail of a return distribution.

use keel_core::{AnalyticsError, AnalyticsResult};
use keel_math::statistics::empirical_quantile;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// One-period loss fractions at a confidence level.
///
/// Both values are fractions of portfolio value, floored at zero, with
/// `cvar >= var`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailLoss {
    /// Loss at the `(1 - confidence)` quantile.
    pub var: f64,
    /// Mean loss at or beyond that quantile.
    pub cvar: f64,
}

impl TailLoss {
    /// Scales both losses by `sqrt(horizon)`.
    #[must_use]
    pub fn scaled(self, horizon_days: u32) -> Self {
        let factor = f64::from(horizon_days).sqrt();
        Self {
            var: self.var * factor,
            cvar: self.cvar * factor,
        }
    }
}

/// Tail of ascending-sorted returns.
///
/// The VaR point is the observation at index `floor((1 - c) * n)`; CVaR
/// averages every observation up to and including it.
pub fn empirical_tail(sorted_returns: &[f64], confidence_level: f64) -> AnalyticsResult<TailLoss> {
    let (index, var_return) = empirical_quantile(sorted_returns, 1.0 - confidence_level)?;
    let tail = &sorted_returns[..=index];
    let tail_mean = tail.iter().sum::<f64>() / tail.len() as f64;

    Ok(TailLoss {
        var: (-var_return).max(0.0),
        cvar: (-tail_mean).max(0.0),
    })
}

/// Converts a loss fraction into money against `portfolio_value`, rounded to cents.
pub(crate) fn to_money(fraction: f64, portfolio_value: Decimal) -> AnalyticsResult<Decimal> {
    let fraction = Decimal::from_f64(fraction).ok_or_else(|| {
        AnalyticsError::invalid_parameter("loss", fraction, "loss fraction is not representable")
    })?;
    Ok((fraction * portfolio_value).round_dp(2))
}
