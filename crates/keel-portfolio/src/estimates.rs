//! Expected returns and covariance estimated from return series.

use std::collections::BTreeSet;

use keel_config::OptimizerConfig;
use keel_core::{AnalyticsError, AnalyticsResult, ReturnSeries, Symbol};
use keel_math::linear_algebra::{shrink_covariance, validate_covariance, CovarianceDiagnostics};
use keel_math::statistics::{covariance_matrix, mean};
use nalgebra::{DMatrix, DVector};

/// Inputs to mean-variance optimization over a symbol universe.
///
/// The covariance has been regularized and validated as positive definite, so
/// every portfolio built from it has strictly positive risk.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEstimates {
    /// Symbols, in the order of the vector and matrix entries.
    pub symbols: Vec<Symbol>,
    /// Expected return per symbol.
    pub expected_returns: DVector<f64>,
    /// Regularized covariance matrix.
    pub covariance: DMatrix<f64>,
    /// Observations per series after alignment (0 for supplied estimates).
    pub observations: usize,
    /// Periods per year applied to the estimates, if annualized.
    pub periods_per_year: Option<u32>,
    /// Eigenvalue summary of the covariance.
    pub diagnostics: CovarianceDiagnostics,
}

impl MarketEstimates {
    /// Estimates from the most recent `lookback` observations of each series.
    ///
    /// Series are aligned on their most recent observations and truncated to
    /// the shortest. Means and sample covariance are optionally annualized,
    /// then the covariance is shrunk and validated.
    pub fn from_series(
        series: &[ReturnSeries],
        lookback: usize,
        config: &OptimizerConfig,
    ) -> AnalyticsResult<Self> {
        if series.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "symbols",
                "[]",
                "empty symbol universe",
            ));
        }
        if lookback < 2 {
            return Err(AnalyticsError::invalid_parameter(
                "lookback",
                lookback,
                "need at least 2 observations",
            ));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = series.iter().find(|s| !seen.insert(&s.symbol)) {
            return Err(AnalyticsError::invalid_parameter(
                "symbols",
                &dup.symbol,
                "duplicate symbol in universe",
            ));
        }
        let frequency = series[0].frequency;
        if let Some(other) = series.iter().find(|s| s.frequency != frequency) {
            return Err(AnalyticsError::invalid_parameter(
                "frequency",
                other.frequency,
                format!(
                    "{} is sampled {} but {} is sampled {}",
                    other.symbol, other.frequency, series[0].symbol, frequency
                ),
            ));
        }

        let windows: Vec<ReturnSeries> = series.iter().map(|s| s.tail(lookback)).collect();
        for w in &windows {
            w.ensure_usable(2, "covariance estimation")?;
        }
        let len = windows.iter().map(ReturnSeries::len).min().unwrap_or(0);
        let columns: Vec<&[f64]> = windows
            .iter()
            .map(|w| &w.returns[w.returns.len() - len..])
            .collect();

        let means = columns
            .iter()
            .map(|c| mean(c))
            .collect::<Result<Vec<_>, _>>()?;
        let sample = covariance_matrix(&columns)?;

        log::debug!(
            "estimating {} assets over {} aligned observations",
            columns.len(),
            len
        );

        let (means, sample, periods) = if config.annualize {
            let ppy = frequency.periods_per_year();
            let scale = f64::from(ppy);
            (
                means.iter().map(|m| m * scale).collect(),
                sample * scale,
                Some(ppy),
            )
        } else {
            (means, sample, None)
        };

        let symbols = series.iter().map(|s| s.symbol.clone()).collect();
        let mut estimates = Self::regularized(symbols, means, sample, config)?;
        estimates.observations = len;
        estimates.periods_per_year = periods;
        Ok(estimates)
    }

    /// Uses supplied expected returns and covariance, regularized the same way
    /// as estimated ones.
    pub fn from_parts(
        symbols: Vec<Symbol>,
        expected_returns: Vec<f64>,
        covariance: DMatrix<f64>,
        config: &OptimizerConfig,
    ) -> AnalyticsResult<Self> {
        if symbols.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "symbols",
                "[]",
                "empty symbol universe",
            ));
        }
        let n = symbols.len();
        if expected_returns.len() != n || covariance.nrows() != n || covariance.ncols() != n {
            return Err(AnalyticsError::invalid_parameter(
                "covariance",
                format!("{}x{}", covariance.nrows(), covariance.ncols()),
                format!("expected {n} returns and a {n}x{n} matrix"),
            ));
        }
        if let Some(bad) = expected_returns.iter().find(|r| !r.is_finite()) {
            return Err(AnalyticsError::invalid_parameter(
                "expected_returns",
                bad,
                "must be finite",
            ));
        }
        Self::regularized(symbols, expected_returns, covariance, config)
    }

    fn regularized(
        symbols: Vec<Symbol>,
        expected_returns: Vec<f64>,
        sample: DMatrix<f64>,
        config: &OptimizerConfig,
    ) -> AnalyticsResult<Self> {
        let covariance = shrink_covariance(
            &sample,
            config.shrinkage_target,
            config.shrinkage_intensity,
        )?;
        let diagnostics = validate_covariance(&covariance, config.max_condition_number)?;
        log::debug!(
            "covariance condition number {:.3e} after {:?} shrinkage {}",
            diagnostics.condition_number,
            config.shrinkage_target,
            config.shrinkage_intensity
        );

        Ok(Self {
            symbols,
            expected_returns: DVector::from_vec(expected_returns),
            covariance,
            observations: 0,
            periods_per_year: None,
            diagnostics,
        })
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true when there are no assets.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Expected return `w·μ`.
    pub fn portfolio_return(&self, weights: &DVector<f64>) -> f64 {
        weights.dot(&self.expected_returns)
    }

    /// Risk `sqrt(wᵀΣw)`.
    pub fn portfolio_risk(&self, weights: &DVector<f64>) -> f64 {
        weights.dot(&(&self.covariance * weights)).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use keel_core::{ErrorKind, SamplingFrequency};
    use keel_math::linear_algebra::ShrinkageTarget;

    fn daily(symbol: &str, returns: Vec<f64>) -> ReturnSeries {
        ReturnSeries::new(symbol, returns, SamplingFrequency::Daily)
    }

    #[test]
    fn test_means_and_alignment() {
        let config = OptimizerConfig::default().with_annualize(false);
        let a = daily("A", vec![0.9, 0.01, -0.01, 0.02, 0.00]);
        let b = daily("B", vec![0.02, 0.01, 0.00, -0.01]);
        let est = MarketEstimates::from_series(&[a, b], 10, &config).unwrap();
        assert_eq!(est.observations, 4);
        assert_relative_eq!(est.expected_returns[0], 0.005, epsilon = 1e-12);
        assert_relative_eq!(est.expected_returns[1], 0.005, epsilon = 1e-12);
        assert!(est.periods_per_year.is_none());
    }

    #[test]
    fn test_annualization() {
        let config = OptimizerConfig::default();
        let a = daily("A", vec![0.01, -0.01, 0.02, 0.00]);
        let b = daily("B", vec![0.00, 0.01, -0.02, 0.01]);
        let est = MarketEstimates::from_series(&[a, b], 4, &config).unwrap();
        assert_eq!(est.periods_per_year, Some(252));
        assert_relative_eq!(est.expected_returns[0], 0.005 * 252.0, epsilon = 1e-10);
    }

    #[test]
    fn test_empty_universe() {
        let err = MarketEstimates::from_series(&[], 30, &OptimizerConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_zero_variance_without_shrinkage_is_singular() {
        let config = OptimizerConfig::default().with_shrinkage(ShrinkageTarget::Diagonal, 0.0);
        let flat = daily("FLAT", vec![0.0; 20]);
        let moving = daily("MOVE", (0..20).map(|i| f64::from(i % 3) / 100.0).collect());
        let err = MarketEstimates::from_series(&[flat, moving], 20, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SingularCovariance);
    }

    #[test]
    fn test_duplicate_assets_repaired_by_shrinkage() {
        let r: Vec<f64> = (0..30).map(|i| f64::from(i % 5 - 2) / 100.0).collect();
        let twins = [daily("A", r.clone()), daily("A2", r)];

        let raw = OptimizerConfig::default().with_shrinkage(ShrinkageTarget::Diagonal, 0.0);
        assert_eq!(
            MarketEstimates::from_series(&twins, 30, &raw).unwrap_err().kind(),
            ErrorKind::SingularCovariance
        );

        let est = MarketEstimates::from_series(&twins, 30, &OptimizerConfig::default()).unwrap();
        assert!(est.diagnostics.min_eigenvalue > 0.0);
    }

    #[test]
    fn test_mixed_frequencies_rejected() {
        let a = daily("A", vec![0.01, 0.02, 0.03]);
        let b = ReturnSeries::new("B", vec![0.01, 0.02, 0.00], SamplingFrequency::Weekly);
        let err = MarketEstimates::from_series(&[a, b], 3, &OptimizerConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
