//! Standard normal distribution helpers.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{MathError, MathResult};

fn standard_normal() -> MathResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| MathError::invalid_input(e.to_string()))
}

/// Standard normal quantile `z(p)`, so that `P(Z <= z) = p`.
///
/// # Example
///
/// ```rust
/// use keel_math::distributions::normal_quantile;
///
/// let z = normal_quantile(0.95).unwrap();
/// assert!((z - 1.644854).abs() < 1e-6);
/// ```
pub fn normal_quantile(p: f64) -> MathResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::invalid_input(format!(
            "quantile probability {p} must lie strictly between 0 and 1"
        )));
    }
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Standard normal density.
pub fn normal_pdf(x: f64) -> MathResult<f64> {
    Ok(standard_normal()?.pdf(x))
}

/// Standard normal cumulative distribution.
pub fn normal_cdf(x: f64) -> MathResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_quantiles() {
        assert_relative_eq!(normal_quantile(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(normal_quantile(0.975).unwrap(), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(normal_quantile(0.99).unwrap(), 2.326348, epsilon = 1e-5);
        assert_relative_eq!(normal_quantile(0.05).unwrap(), -1.644854, epsilon = 1e-5);
    }

    #[test]
    fn test_quantile_domain() {
        assert!(normal_quantile(0.0).is_err());
        assert!(normal_quantile(1.0).is_err());
        assert!(normal_quantile(f64::NAN).is_err());
    }

    #[test]
    fn test_pdf_and_cdf() {
        assert_relative_eq!(normal_pdf(0.0).unwrap(), 0.398_942_28, epsilon = 1e-8);
        assert_relative_eq!(normal_cdf(0.0).unwrap(), 0.5, epsilon = 1e-12);
        let z = normal_quantile(0.9).unwrap();
        assert_relative_eq!(normal_cdf(z).unwrap(), 0.9, epsilon = 1e-9);
    }
}
