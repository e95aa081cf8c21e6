//! Benchmarks for the keel-var estimation methods.
//!
//! Run with: cargo bench -p keel-var

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keel_core::CancellationToken;
use keel_var::prelude::*;
use rust_decimal_macros::dec;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn synthetic_returns(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| ((i * 7919) % 401) as f64 / 10_000.0 - 0.02)
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_historical(c: &mut Criterion) {
    let calc = VaRCalculator::default();
    let token = CancellationToken::new();
    let request = VaRRequest::new(0.99, 1, dec!(1000000), VaRMethod::Historical);

    let mut group = c.benchmark_group("historical_var");
    for n in [250usize, 2_500, 25_000] {
        let returns = synthetic_returns(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &returns, |b, returns| {
            b.iter(|| calc.calculate(black_box(&request), black_box(returns), &token));
        });
    }
    group.finish();
}

fn bench_monte_carlo(c: &mut Criterion) {
    let calc = VaRCalculator::default();
    let token = CancellationToken::new();
    let moments = ReturnMoments::new(0.0005, 0.02).unwrap();

    let mut group = c.benchmark_group("monte_carlo_var");
    group.sample_size(20);
    for n in [10_000u32, 100_000, 1_000_000] {
        let request = VaRRequest::new(
            0.99,
            1,
            dec!(1000000),
            VaRMethod::MonteCarlo(MonteCarloParams::new(n, 42)),
        );
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, request| {
            b.iter(|| calc.calculate_from_moments(black_box(request), moments, &token));
        });
    }
    group.finish();
}

criterion_group!(var, bench_historical, bench_monte_carlo);
criterion_main!(var);
