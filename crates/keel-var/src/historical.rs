//! Historical simulation VaR.

use keel_core::{AnalyticsError, AnalyticsResult};

use crate::tail::{empirical_tail, TailLoss};

/// One-period tail of observed returns.
///
/// # Arguments
///
/// * `returns` - Historical returns (as decimals, e.g., -0.01 for -1%)
/// * `confidence_level` - Confidence level (e.g., 0.95 for 95%)
/// * `min_observations` - Fewest observations accepted
pub fn historical_tail(
    returns: &[f64],
    confidence_level: f64,
    min_observations: usize,
) -> AnalyticsResult<TailLoss> {
    let required = min_observations.max(1);
    if returns.len() < required {
        return Err(AnalyticsError::insufficient_data(
            "historical VaR",
            required,
            returns.len(),
        ));
    }
    if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
        return Err(AnalyticsError::invalid_parameter(
            "returns",
            bad,
            "contains a non-finite return",
        ));
    }

    // Sort returns (ascending - worst returns first)
    let mut sorted = returns.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let tail = empirical_tail(&sorted, confidence_level)?;
    log::debug!(
        "historical tail over {} returns: var={:.6} cvar={:.6}",
        sorted.len(),
        tail.var,
        tail.cvar
    );
    Ok(tail)
}
