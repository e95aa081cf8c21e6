//! VaR/CVaR calculator dispatching over [`VaRMethod`].

use chrono::Utc;
use keel_config::VarConfig;
use keel_core::{AnalyticsError, AnalyticsResult, CancellationToken};
use rust_decimal::Decimal;

use crate::historical::historical_tail;
use crate::monte_carlo::monte_carlo_tail;
use crate::moments::ReturnMoments;
use crate::parametric::parametric_tail;
use crate::tail::{to_money, TailLoss};
use crate::types::{MonteCarloParams, VaRMethod, VaRRequest, VaRResult};

/// Computes VaR and CVaR with the method selected by each request.
///
/// All methods produce a one-period loss that is scaled by `sqrt(horizon)`.
///
/// # Example
///
/// ```rust
/// use keel_config::VarConfig;
/// use keel_core::CancellationToken;
/// use keel_var::{ReturnMoments, VaRCalculator, VaRMethod, VaRRequest};
/// use rust_decimal_macros::dec;
///
/// let calculator = VaRCalculator::new(VarConfig::default());
/// let request = VaRRequest::new(0.95, 1, dec!(100000), VaRMethod::Parametric);
/// let moments = ReturnMoments::new(0.001, 0.02).unwrap();
///
/// let result = calculator
///     .calculate_from_moments(&request, moments, &CancellationToken::new())
///     .unwrap();
/// assert!(result.var > dec!(3185) && result.var < dec!(3195));
/// ```
#[derive(Debug, Clone, Default)]
pub struct VaRCalculator {
    config: VarConfig,
}

impl VaRCalculator {
    /// Creates a calculator with the given settings.
    #[must_use]
    pub fn new(config: VarConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &VarConfig {
        &self.config
    }

    /// VaR and CVaR from an observed return series.
    ///
    /// Historical simulation uses the observations directly. Parametric and
    /// Monte Carlo estimate mean and volatility from them first.
    pub fn calculate(
        &self,
        request: &VaRRequest,
        returns: &[f64],
        cancel: &CancellationToken,
    ) -> AnalyticsResult<VaRResult> {
        request.validate()?;
        cancel.check("VaR")?;

        let (tail, sample_size) = match request.method {
            VaRMethod::Historical => (
                historical_tail(
                    returns,
                    request.confidence_level,
                    self.config.min_historical_observations,
                )?,
                returns.len(),
            ),
            VaRMethod::Parametric => {
                let moments = ReturnMoments::from_returns(returns)?;
                (parametric_tail(&moments, request.confidence_level)?, returns.len())
            }
            VaRMethod::MonteCarlo(params) => {
                let moments = ReturnMoments::from_returns(returns)?;
                self.simulate(request, &moments, &params, cancel)?
            }
        };

        Self::finish(request, tail, sample_size)
    }

    /// VaR and CVaR from supplied portfolio moments.
    ///
    /// Historical simulation needs observations and is rejected here.
    pub fn calculate_from_moments(
        &self,
        request: &VaRRequest,
        moments: ReturnMoments,
        cancel: &CancellationToken,
    ) -> AnalyticsResult<VaRResult> {
        request.validate()?;
        cancel.check("VaR")?;

        let (tail, sample_size) = match request.method {
            VaRMethod::Historical => {
                return Err(AnalyticsError::invalid_parameter(
                    "method",
                    request.method,
                    "historical simulation requires a return series",
                ));
            }
            VaRMethod::Parametric => (parametric_tail(&moments, request.confidence_level)?, 0),
            VaRMethod::MonteCarlo(params) => self.simulate(request, &moments, &params, cancel)?,
        };

        Self::finish(request, tail, sample_size)
    }

    /// CVaR only.
    pub fn calculate_cvar(
        &self,
        request: &VaRRequest,
        returns: &[f64],
        cancel: &CancellationToken,
    ) -> AnalyticsResult<Decimal> {
        self.calculate(request, returns, cancel).map(|r| r.cvar)
    }

    fn simulate(
        &self,
        request: &VaRRequest,
        moments: &ReturnMoments,
        params: &MonteCarloParams,
        cancel: &CancellationToken,
    ) -> AnalyticsResult<(TailLoss, usize)> {
        if params.simulations < self.config.min_simulations {
            return Err(AnalyticsError::invalid_parameter(
                "simulations",
                params.simulations,
                format!("at least {} simulations required", self.config.min_simulations),
            ));
        }
        let tail = monte_carlo_tail(
            moments,
            params,
            request.confidence_level,
            self.config.simulation_batch_size,
            cancel,
        )?;
        Ok((tail, params.simulations as usize))
    }

    fn finish(
        request: &VaRRequest,
        tail: TailLoss,
        sample_size: usize,
    ) -> AnalyticsResult<VaRResult> {
        let scaled = tail.scaled(request.horizon_days);
        let var = to_money(scaled.var, request.portfolio_value)?;
        // Rounding can only tie the two, never invert them
        let cvar = to_money(scaled.cvar, request.portfolio_value)?.max(var);

        log::debug!(
            "{} VaR at {}: var={} cvar={} over {} samples",
            request.method,
            request.confidence_level,
            var,
            cvar,
            sample_size
        );

        Ok(VaRResult {
            var,
            cvar,
            confidence_level: request.confidence_level,
            horizon_days: request.horizon_days,
            method: request.method,
            sample_size,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::ErrorKind;
    use rust_decimal_macros::dec;

    fn parametric_request() -> VaRRequest {
        VaRRequest::new(0.95, 1, dec!(100000), VaRMethod::Parametric)
    }

    #[test]
    fn test_parametric_reference_value() {
        let calc = VaRCalculator::default();
        let moments = ReturnMoments::new(0.001, 0.02).unwrap();
        let result = calc
            .calculate_from_moments(&parametric_request(), moments, &CancellationToken::new())
            .unwrap();

        // 100000 × (1.6449 × 0.02 − 0.001)
        assert!((result.var - dec!(3189.71)).abs() <= dec!(0.05), "{}", result.var);
        assert!(result.cvar >= result.var);
        assert_eq!(result.method, VaRMethod::Parametric);
    }

    #[test]
    fn test_horizon_scaling() {
        let calc = VaRCalculator::default();
        let moments = ReturnMoments::new(0.0, 0.01).unwrap();
        let token = CancellationToken::new();
        let one = calc
            .calculate_from_moments(&parametric_request(), moments, &token)
            .unwrap();
        let mut four_day = parametric_request();
        four_day.horizon_days = 4;
        let four = calc.calculate_from_moments(&four_day, moments, &token).unwrap();
        assert!((four.var - one.var * dec!(2)).abs() <= dec!(0.02));
    }

    #[test]
    fn test_historical_reference_observation() {
        let calc = VaRCalculator::new(VarConfig::default().with_min_historical_observations(6));
        let returns = [-0.05, -0.03, -0.01, 0.00, 0.02, 0.04];
        let request = VaRRequest::new(0.83, 1, dec!(100000), VaRMethod::Historical);
        let result = calc
            .calculate(&request, &returns, &CancellationToken::new())
            .unwrap();
        assert_eq!(result.var, dec!(3000.00));
        assert_eq!(result.cvar, dec!(4000.00));
        assert_eq!(result.sample_size, 6);
    }

    #[test]
    fn test_historical_requires_thirty_observations() {
        let calc = VaRCalculator::default();
        let returns = [-0.05, -0.03, -0.01, 0.00, 0.02, 0.04];
        let request = VaRRequest::new(0.95, 1, dec!(100000), VaRMethod::Historical);
        let err = calc
            .calculate(&request, &returns, &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_historical_from_moments_rejected() {
        let calc = VaRCalculator::default();
        let request = VaRRequest::new(0.95, 1, dec!(100000), VaRMethod::Historical);
        let err = calc
            .calculate_from_moments(
                &request,
                ReturnMoments::new(0.0, 0.01).unwrap(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_too_few_simulations() {
        let calc = VaRCalculator::default();
        let request = VaRRequest::new(
            0.95,
            1,
            dec!(100000),
            VaRMethod::MonteCarlo(MonteCarloParams::new(999, 1)),
        );
        let err = calc
            .calculate_from_moments(
                &request,
                ReturnMoments::new(0.0, 0.01).unwrap(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_invalid_confidence() {
        let calc = VaRCalculator::default();
        let request = VaRRequest::new(1.5, 1, dec!(100000), VaRMethod::Parametric);
        let err = calc
            .calculate_from_moments(
                &request,
                ReturnMoments::new(0.0, 0.01).unwrap(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_cancelled_request() {
        let calc = VaRCalculator::default();
        let token = CancellationToken::new();
        token.cancel();
        let err = calc
            .calculate_from_moments(
                &parametric_request(),
                ReturnMoments::new(0.0, 0.01).unwrap(),
                &token,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_calculate_cvar() {
        let calc = VaRCalculator::default();
        let returns: Vec<f64> = (0..60).map(|i| f64::from(i - 30) / 1000.0).collect();
        let request = VaRRequest::new(0.75, 1, dec!(1000), VaRMethod::Historical);
        let cvar = calc
            .calculate_cvar(&request, &returns, &CancellationToken::new())
            .unwrap();
        // Tail holds -0.030..=-0.015, mean -0.0225
        assert_eq!(cvar, dec!(22.50));
    }
}
