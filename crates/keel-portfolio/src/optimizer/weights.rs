//! Conversion of solver output into decimal weights.

use keel_core::{AnalyticsError, AnalyticsResult, Symbol, Weights};
use nalgebra::DVector;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

fn to_decimal(value: f64, name: &str) -> AnalyticsResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| AnalyticsError::invalid_parameter(name, value, "not representable as a decimal"))
}

/// Rounds solver weights to `decimal_places` and restores an exact unit sum.
///
/// Each weight is clamped into `[lower, upper]` after rounding. The rounding
/// residual goes to the weight with the most room to absorb it.
pub(crate) fn round_weights(
    symbols: &[Symbol],
    x: &DVector<f64>,
    decimal_places: u32,
    lower: f64,
    upper: f64,
) -> AnalyticsResult<Weights> {
    let lower = to_decimal(lower, "min_weight")?;
    let upper = to_decimal(upper, "max_weight")?;

    let mut rounded = Vec::with_capacity(x.len());
    for &w in x.iter() {
        let d = to_decimal(w, "weight")?.round_dp(decimal_places);
        rounded.push(d.max(lower).min(upper));
    }

    let residual = Decimal::ONE - rounded.iter().copied().sum::<Decimal>();
    if !residual.is_zero() {
        let slack = |w: &Decimal| {
            if residual.is_sign_positive() {
                upper - *w
            } else {
                *w - lower
            }
        };
        let best = rounded
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| slack(a).cmp(&slack(b)))
            .map(|(i, _)| i);
        if let Some(i) = best {
            rounded[i] += residual;
        }
    }

    Ok(symbols.iter().cloned().zip(rounded).collect())
}

/// Weights back in solver order as `f64`.
pub(crate) fn weight_vector(symbols: &[Symbol], weights: &Weights) -> DVector<f64> {
    DVector::from_iterator(
        symbols.len(),
        symbols
            .iter()
            .map(|s| weights.get(s).to_f64().unwrap_or(0.0)),
    )
}
