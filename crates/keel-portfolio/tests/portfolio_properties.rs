//! Property tests for optimization, rebalancing and stress testing.

use keel_config::{OptimizerConfig, RebalanceConfig};
use keel_core::{CancellationToken, Position, ReturnSeries, SamplingFrequency, Symbol, Weights};
use keel_portfolio::prelude::*;
use proptest::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

// ===== TEST DATA GENERATORS =====

fn synthetic_series(count: usize, observations: usize) -> Vec<ReturnSeries> {
    (0..count)
        .map(|i| {
            let k = (i + 1) as f64;
            let returns = (0..observations)
                .map(|t| 0.001 * k + 0.01 * (t as f64 * k * 0.7 + i as f64).sin())
                .collect();
            ReturnSeries::new(format!("ASSET{i}"), returns, SamplingFrequency::Daily)
        })
        .collect()
}

/// One market factor plus an idiosyncratic wave per asset; betas and drifts
/// differ so every asset has its own expected return.
fn market_factor_series(count: usize, observations: usize) -> Vec<ReturnSeries> {
    let market: Vec<f64> = (0..observations)
        .map(|t| {
            let t = t as f64;
            0.012 * (0.9 * t).sin() + 0.005 * (2.3 * t + 0.4).cos()
        })
        .collect();
    (0..count)
        .map(|i| {
            let beta = 0.6 + 0.1 * i as f64;
            let drift = 0.0003 * (i as f64 - 4.5);
            let returns = market
                .iter()
                .enumerate()
                .map(|(t, m)| {
                    let phase = t as f64 * (1.3 + 0.37 * i as f64) + i as f64;
                    drift + beta * m + 0.006 * phase.sin()
                })
                .collect();
            ReturnSeries::new(format!("F{i:02}"), returns, SamplingFrequency::Daily)
        })
        .collect()
}

/// Highest-return portfolio under uniform bounds: best assets filled first.
fn greedy_max_return(estimates: &MarketEstimates, lo: f64, hi: f64) -> Vec<f64> {
    let n = estimates.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        estimates.expected_returns[b].total_cmp(&estimates.expected_returns[a])
    });
    let mut weights = vec![lo; n];
    let mut remaining = 1.0 - lo * n as f64;
    for i in order {
        let extra = remaining.clamp(0.0, hi - lo);
        remaining -= extra;
        weights[i] += extra;
    }
    weights
}

/// Basis-point weights normalized so the last symbol absorbs the remainder.
fn basis_point_weights(prefix: &str, raw: &[u32]) -> Weights {
    let total: u32 = raw.iter().sum::<u32>().max(1);
    let mut weights = Weights::new();
    let mut assigned = Decimal::ZERO;
    for (i, bp) in raw.iter().enumerate() {
        let w = if i + 1 == raw.len() {
            Decimal::ONE - assigned
        } else {
            (Decimal::from(*bp) / Decimal::from(total))
                .round_dp_with_strategy(4, RoundingStrategy::ToZero)
        };
        assigned += w;
        weights.set(Symbol::new(format!("{prefix}{i}")), w);
    }
    weights
}

// ===== OPTIMIZER =====

#[test]
fn frontier_weights_respect_bounds_and_budget() {
    let config = OptimizerConfig::long_only(0.6);
    let estimates = MarketEstimates::from_series(&synthetic_series(4, 120), 120, &config).unwrap();
    let frontier = PortfolioOptimizer::new(config)
        .efficient_frontier(&estimates, 12, &CancellationToken::new())
        .unwrap();

    assert!(!frontier.is_empty());
    for point in &frontier {
        assert_eq!(point.weights.sum(), Decimal::ONE);
        for (_, w) in point.weights.iter() {
            assert!(*w >= Decimal::ZERO && *w <= dec!(0.6), "weight {w} out of bounds");
        }
    }
    for pair in frontier.windows(2) {
        assert!(pair[1].risk >= pair[0].risk);
        assert!(pair[1].expected_return >= pair[0].expected_return - 1e-6);
    }
}

#[test]
fn frontier_is_identical_across_thread_pools() {
    let config = OptimizerConfig::default();
    let estimates = MarketEstimates::from_series(&synthetic_series(5, 90), 60, &config).unwrap();
    let optimizer = PortfolioOptimizer::new(config);
    let token = CancellationToken::new();

    let default_pool = optimizer.efficient_frontier(&estimates, 16, &token).unwrap();
    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| optimizer.efficient_frontier(&estimates, 16, &token).unwrap());
    assert_eq!(default_pool, single);
}

#[test]
fn bounded_many_asset_frontier_reaches_max_return_vertex() {
    let series = market_factor_series(12, 40);
    for max_weight in [1.0, 0.3, 0.25] {
        let config = OptimizerConfig::long_only(max_weight);
        let estimates = MarketEstimates::from_series(&series, 40, &config).unwrap();
        let optimizer = PortfolioOptimizer::new(config);
        let token = CancellationToken::new();

        for points in [2, 5, 12] {
            let frontier = optimizer
                .efficient_frontier(&estimates, points, &token)
                .unwrap_or_else(|e| panic!("max_weight {max_weight}, {points} points: {e}"));
            assert_eq!(frontier.len(), points);

            let bound = Decimal::try_from(max_weight).unwrap();
            for point in &frontier {
                assert_eq!(point.weights.sum(), Decimal::ONE);
                for (_, w) in point.weights.iter() {
                    assert!(*w >= Decimal::ZERO && *w <= bound, "weight {w} above {bound}");
                }
            }
            for pair in frontier.windows(2) {
                assert!(pair[1].risk > pair[0].risk);
                assert!(pair[1].expected_return > pair[0].expected_return - 1e-9);
            }

            let top = frontier.last().unwrap();
            let vertex = greedy_max_return(&estimates, 0.0, max_weight);
            for (symbol, expected) in estimates.symbols.iter().zip(&vertex) {
                let actual = top.weights.get(symbol).to_f64().unwrap();
                assert!(
                    (actual - expected).abs() < 1e-9,
                    "{symbol}: {actual} vs vertex {expected}"
                );
            }
        }
    }
}

#[test]
fn bounded_many_asset_max_sharpe_beats_frontier() {
    let series = market_factor_series(12, 40);
    for max_weight in [1.0, 0.3, 0.25] {
        let config = OptimizerConfig::long_only(max_weight);
        let estimates = MarketEstimates::from_series(&series, 40, &config).unwrap();
        let optimizer = PortfolioOptimizer::new(config);
        let token = CancellationToken::new();

        let best = optimizer
            .max_sharpe(&estimates, 0.0, &token)
            .unwrap_or_else(|e| panic!("max_weight {max_weight}: {e}"));
        assert_eq!(best.weights.sum(), Decimal::ONE);
        for point in optimizer.efficient_frontier(&estimates, 12, &token).unwrap() {
            let sharpe = point.expected_return / point.risk;
            assert!(best.sharpe_ratio >= sharpe - 1e-5, "{} < {sharpe}", best.sharpe_ratio);
        }
    }
}

#[test]
fn min_variance_is_least_risky_frontier_point() {
    let config = OptimizerConfig::default();
    let estimates = MarketEstimates::from_series(&synthetic_series(3, 200), 200, &config).unwrap();
    let optimizer = PortfolioOptimizer::new(config);
    let min_var = optimizer.min_variance(&estimates).unwrap();
    let frontier = optimizer
        .efficient_frontier(&estimates, 8, &CancellationToken::new())
        .unwrap();
    for point in frontier {
        assert!(point.risk >= min_var.risk - 1e-6);
    }
}

// ===== REBALANCER =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn rebalance_reaches_target_exactly(
        current_raw in prop::collection::vec(1u32..10_000, 1..6),
        target_raw in prop::collection::vec(1u32..10_000, 1..6),
        total in 1_000u64..10_000_000,
    ) {
        let current = basis_point_weights("S", &current_raw);
        let target = basis_point_weights("S", &target_raw);
        let total_value = Decimal::from(total);

        let plan = Rebalancer::new(RebalanceConfig::default())
            .from_weights(&current, &target, total_value)
            .unwrap();

        let deltas = plan.deltas();
        let symbols = current.symbols().chain(target.symbols());
        for symbol in symbols {
            let before = current.get(symbol) * total_value;
            let delta = deltas.get(symbol).copied().unwrap_or(Decimal::ZERO);
            prop_assert_eq!(before + delta, target.get(symbol) * total_value);
        }

        let turnover: Decimal = plan.trades.iter().map(|t| t.delta.abs()).sum();
        prop_assert_eq!(plan.turnover, turnover);
        prop_assert!(plan.skipped.is_empty());
    }

    // ===== STRESS =====

    #[test]
    fn stress_pnl_is_linear_in_shock(
        quantities in prop::collection::vec(-50i64..50, 1..5),
        shock in -90i64..90,
    ) {
        let positions: Vec<Position> = quantities
            .iter()
            .enumerate()
            .filter(|(_, q)| **q != 0)
            .map(|(i, q)| {
                Position::builder(format!("P{i}"))
                    .quantity(Decimal::from(*q))
                    .entry_price(dec!(100))
                    .build()
                    .unwrap()
            })
            .collect();

        let single = StressScenario::new("single").with_market_shock(Decimal::from(shock));
        let doubled = single.clone().with_volatility_multiplier(dec!(2));
        if shock >= -50 {
            let a = run_stress_scenario(&positions, &single).unwrap();
            let b = run_stress_scenario(&positions, &doubled).unwrap();
            prop_assert_eq!(b.total_pnl, a.total_pnl * dec!(2));
        }

        let result = run_stress_scenario(&positions, &single).unwrap();
        let expected: Decimal = positions
            .iter()
            .map(|p| p.market_value() * Decimal::from(shock) / dec!(100))
            .sum();
        prop_assert_eq!(result.total_pnl, expected);
        prop_assert_eq!(result.stressed_value, result.initial_value + result.total_pnl);
    }
}
