//! Parametric (variance-covariance) VaR calculation.

use keel_core::AnalyticsResult;
use keel_math::distributions::{normal_pdf, normal_quantile};

use crate::moments::ReturnMoments;
use crate::tail::TailLoss;

/// One-period tail under a normal assumption.
///
/// VaR = `z·σ − μ` and CVaR = `σ·φ(z)/(1 − c) − μ`, both floored at zero.
/// Zero volatility with a non-negative mean yields zero losses.
pub fn parametric_tail(moments: &ReturnMoments, confidence_level: f64) -> AnalyticsResult<TailLoss> {
    let z = normal_quantile(confidence_level)?;
    let sigma = moments.volatility;
    let mu = moments.mean;

    let var = z * sigma - mu;
    let cvar = sigma * normal_pdf(z)? / (1.0 - confidence_level) - mu;

    Ok(TailLoss {
        var: var.max(0.0),
        cvar: cvar.max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_normal_quantile() {
        let moments = ReturnMoments::new(0.001, 0.02).unwrap();
        let tail = parametric_tail(&moments, 0.95).unwrap();
        // 1.6449 × 0.02 − 0.001
        assert_relative_eq!(tail.var, 0.031897, epsilon = 1e-5);
        assert!(tail.cvar > tail.var);
    }

    #[test]
    fn test_zero_volatility() {
        let gain = ReturnMoments::new(0.001, 0.0).unwrap();
        let tail = parametric_tail(&gain, 0.99).unwrap();
        assert_eq!(tail.var, 0.0);
        assert_eq!(tail.cvar, 0.0);

        let loss = ReturnMoments::new(-0.002, 0.0).unwrap();
        let tail = parametric_tail(&loss, 0.99).unwrap();
        assert_relative_eq!(tail.var, 0.002);
        assert_relative_eq!(tail.cvar, 0.002);
    }
}
