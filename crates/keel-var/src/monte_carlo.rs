//! Monte Carlo VaR.
//!
//! Draws are generated in fixed-size batches. Batch `i` uses a `ChaCha8Rng`
//! seeded from the request seed on stream `i`, so the simulated sample is the
//! same whether batches run sequentially or on any number of threads.
//! Cancellation is checked at the start of every batch.

use keel_core::{AnalyticsError, AnalyticsResult, CancellationToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, StudentT};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::moments::ReturnMoments;
use crate::tail::{empirical_tail, TailLoss};
use crate::types::{MonteCarloParams, SimulationDistribution};

const OPERATION: &str = "monte carlo VaR";

/// Draws one-period returns with the requested mean and volatility.
#[derive(Debug, Clone)]
enum Sampler {
    Normal(Normal<f64>),
    StudentT {
        dist: StudentT<f64>,
        mean: f64,
        scale: f64,
    },
}

impl Sampler {
    fn new(moments: &ReturnMoments, distribution: SimulationDistribution) -> AnalyticsResult<Self> {
        match distribution {
            SimulationDistribution::Normal => Normal::new(moments.mean, moments.volatility)
                .map(Self::Normal)
                .map_err(|e| {
                    AnalyticsError::invalid_parameter("volatility", moments.volatility, e.to_string())
                }),
            SimulationDistribution::StudentT { degrees_of_freedom } => {
                if !degrees_of_freedom.is_finite() || degrees_of_freedom <= 2.0 {
                    return Err(AnalyticsError::invalid_parameter(
                        "degrees_of_freedom",
                        degrees_of_freedom,
                        "must exceed 2 for a finite variance",
                    ));
                }
                let dist = StudentT::new(degrees_of_freedom).map_err(|e| {
                    AnalyticsError::invalid_parameter(
                        "degrees_of_freedom",
                        degrees_of_freedom,
                        e.to_string(),
                    )
                })?;
                // A t variate has variance ν/(ν−2)
                let scale =
                    moments.volatility * ((degrees_of_freedom - 2.0) / degrees_of_freedom).sqrt();
                Ok(Self::StudentT {
                    dist,
                    mean: moments.mean,
                    scale,
                })
            }
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Normal(dist) => dist.sample(rng),
            Self::StudentT { dist, mean, scale } => mean + scale * dist.sample(rng),
        }
    }
}

/// Simulates `params.simulations` one-period returns.
///
/// The returned sample is in batch order and is not sorted.
pub fn simulate_returns(
    moments: &ReturnMoments,
    params: &MonteCarloParams,
    batch_size: u32,
    cancel: &CancellationToken,
) -> AnalyticsResult<Vec<f64>> {
    simulate_returns_with_progress(moments, params, batch_size, cancel, |_| {})
}

/// [`simulate_returns`], calling `progress` with the number of finished
/// batches after each batch.
pub fn simulate_returns_with_progress<P>(
    moments: &ReturnMoments,
    params: &MonteCarloParams,
    batch_size: u32,
    cancel: &CancellationToken,
    progress: P,
) -> AnalyticsResult<Vec<f64>>
where
    P: Fn(usize) + Sync + Send,
{
    if batch_size == 0 {
        return Err(AnalyticsError::invalid_parameter(
            "simulation_batch_size",
            batch_size,
            "must be positive",
        ));
    }
    let sampler = Sampler::new(moments, params.distribution)?;
    let total = params.simulations as usize;
    let batch_size = batch_size as usize;
    let batch_count = total.div_ceil(batch_size);

    let finished = AtomicUsize::new(0);
    let run_batch = |index: usize| -> AnalyticsResult<Vec<f64>> {
        cancel.check(OPERATION)?;
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        rng.set_stream(index as u64);
        let len = batch_size.min(total - index * batch_size);
        let batch = (0..len).map(|_| sampler.draw(&mut rng)).collect();
        progress(finished.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(batch)
    };

    #[cfg(feature = "parallel")]
    let batches: Vec<Vec<f64>> = (0..batch_count)
        .into_par_iter()
        .map(run_batch)
        .collect::<AnalyticsResult<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let batches: Vec<Vec<f64>> = (0..batch_count)
        .map(run_batch)
        .collect::<AnalyticsResult<_>>()?;

    log::debug!(
        "simulated {} returns in {} batches (seed {})",
        total,
        batch_count,
        params.seed
    );
    Ok(batches.concat())
}

/// One-period tail of simulated returns.
pub fn monte_carlo_tail(
    moments: &ReturnMoments,
    params: &MonteCarloParams,
    confidence_level: f64,
    batch_size: u32,
    cancel: &CancellationToken,
) -> AnalyticsResult<TailLoss> {
    let mut simulated = simulate_returns(moments, params, batch_size, cancel)?;
    simulated.sort_unstable_by(f64::total_cmp);
    empirical_tail(&simulated, confidence_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use keel_core::ErrorKind;

    fn moments() -> ReturnMoments {
        ReturnMoments::new(0.0005, 0.02).unwrap()
    }

    #[test]
    fn test_same_seed_same_sample() {
        let params = MonteCarloParams::new(5_000, 7);
        let token = CancellationToken::new();
        let a = simulate_returns(&moments(), &params, 1_000, &token).unwrap();
        let b = simulate_returns(&moments(), &params, 1_000, &token).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5_000);

        let c = simulate_returns(&moments(), &MonteCarloParams::new(5_000, 8), 1_000, &token)
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_partial_last_batch() {
        let params = MonteCarloParams::new(2_500, 1);
        let sample =
            simulate_returns(&moments(), &params, 1_000, &CancellationToken::new()).unwrap();
        assert_eq!(sample.len(), 2_500);
    }

    #[test]
    fn test_sample_independent_of_thread_count() {
        let params = MonteCarloParams::new(20_000, 99);
        let token = CancellationToken::new();
        let default_pool = simulate_returns(&moments(), &params, 1_000, &token).unwrap();

        #[cfg(feature = "parallel")]
        {
            let single = rayon::ThreadPoolBuilder::new()
                .num_threads(1)
                .build()
                .unwrap()
                .install(|| simulate_returns(&moments(), &params, 1_000, &token).unwrap());
            assert_eq!(single, default_pool);
        }
        assert_eq!(default_pool.len(), 20_000);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = simulate_returns(&moments(), &MonteCarloParams::new(10_000, 1), 1_000, &token)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_cancelled_between_batches() {
        let token = CancellationToken::new();
        let finished = AtomicUsize::new(0);
        let params = MonteCarloParams::new(1_000_000, 1);

        let err = simulate_returns_with_progress(&moments(), &params, 1_000, &token, |done| {
            finished.fetch_max(done, Ordering::SeqCst);
            if done == 3 {
                token.cancel();
            }
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        // Batches already running may finish; no new batch starts
        let done = finished.load(Ordering::SeqCst);
        assert!(done >= 3 && done < 1_000, "{done} batches ran");
    }

    #[test]
    fn test_progress_reports_every_batch() {
        let calls = AtomicUsize::new(0);
        let sample = simulate_returns_with_progress(
            &moments(),
            &MonteCarloParams::new(2_500, 1),
            1_000,
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
        assert_eq!(sample.len(), 2_500);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_student_t_matches_volatility() {
        let params = MonteCarloParams::new(200_000, 3).with_distribution(
            SimulationDistribution::StudentT {
                degrees_of_freedom: 5.0,
            },
        );
        let sample =
            simulate_returns(&moments(), &params, 10_000, &CancellationToken::new()).unwrap();
        let sd = keel_math::statistics::std_dev(&sample).unwrap();
        assert_relative_eq!(sd, 0.02, max_relative = 0.05);
    }

    #[test]
    fn test_student_t_requires_finite_variance() {
        let params = MonteCarloParams::new(1_000, 3).with_distribution(
            SimulationDistribution::StudentT {
                degrees_of_freedom: 2.0,
            },
        );
        let err = simulate_returns(&moments(), &params, 1_000, &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
