//! Stress impact calculations.
//!
//! Each position is repriced at `current_price × (1 + effective_shock)` and its
//! P&L is `quantity × current_price × effective_shock`, so shorts gain on
//! down-shocks. Amounts are rounded to cents per position.

use std::collections::{BTreeMap, BTreeSet};

use keel_core::{AnalyticsError, AnalyticsResult, CancellationToken, Position, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scenarios::StressScenario;
use crate::parallel::try_maybe_parallel_map;

/// Result of a stress scenario applied to a set of positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressResult {
    /// Scenario name.
    pub scenario_name: String,
    /// Signed P&L per held symbol (zero when the scenario does not touch it).
    pub symbol_pnl: BTreeMap<Symbol, Decimal>,
    /// Aggregate signed P&L.
    pub total_pnl: Decimal,
    /// Net market value before the shock.
    pub initial_value: Decimal,
    /// Net market value after the shock.
    pub stressed_value: Decimal,
    /// Gross exposure before the shock.
    pub gross_exposure: Decimal,
    /// P&L as a percentage of gross exposure (zero without exposure).
    pub pnl_pct: Decimal,
}

impl StressResult {
    /// Returns true if this is a gain.
    #[must_use]
    pub fn is_gain(&self) -> bool {
        self.total_pnl > Decimal::ZERO
    }

    /// Returns true if this is a loss.
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.total_pnl < Decimal::ZERO
    }

    /// P&L of one symbol, zero if not held.
    pub fn pnl_for(&self, symbol: &Symbol) -> Decimal {
        self.symbol_pnl.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Applies one scenario to the positions.
///
/// The positions are read only; the scenario operates on their values.
pub fn run_stress_scenario(
    positions: &[Position],
    scenario: &StressScenario,
) -> AnalyticsResult<StressResult> {
    scenario.validate()?;

    let mut symbol_pnl = BTreeMap::new();
    let mut initial_value = Decimal::ZERO;
    let mut gross_exposure = Decimal::ZERO;

    for position in positions {
        initial_value += position.market_value();
        gross_exposure += position.notional();

        let pnl = scenario
            .effective_shock(&position.symbol)
            .map_or(Decimal::ZERO, |shock| {
                (position.market_value() * shock).round_dp(2)
            });
        *symbol_pnl
            .entry(position.symbol.clone())
            .or_insert(Decimal::ZERO) += pnl;
    }

    let total_pnl: Decimal = symbol_pnl.values().copied().sum();
    let pnl_pct = if gross_exposure.is_zero() {
        Decimal::ZERO
    } else {
        (total_pnl / gross_exposure * Decimal::ONE_HUNDRED).round_dp(4)
    };

    log::debug!(
        "stress '{}': {} symbols, total P&L {}",
        scenario.name,
        symbol_pnl.len(),
        total_pnl
    );

    Ok(StressResult {
        scenario_name: scenario.name.clone(),
        symbol_pnl,
        total_pnl,
        initial_value,
        stressed_value: initial_value + total_pnl,
        gross_exposure,
        pnl_pct,
    })
}

/// Applies each scenario independently, returning results in input order.
///
/// Scenario names must be unique. Cancellation is checked before each
/// scenario; scenarios run on the rayon pool once there are at least
/// `parallel_threshold` of them.
pub fn run_stress_scenarios(
    positions: &[Position],
    scenarios: &[StressScenario],
    parallel_threshold: usize,
    cancel: &CancellationToken,
) -> AnalyticsResult<Vec<StressResult>> {
    let mut names = BTreeSet::new();
    if let Some(dup) = scenarios.iter().find(|s| !names.insert(s.name.as_str())) {
        return Err(AnalyticsError::invalid_parameter(
            "scenarios",
            &dup.name,
            "duplicate scenario name",
        ));
    }

    try_maybe_parallel_map(scenarios, parallel_threshold, |scenario| {
        cancel.check("stress test")?;
        run_stress_scenario(positions, scenario)
    })
}

/// Per-scenario, per-symbol P&L keyed by scenario name.
pub fn pnl_by_scenario(results: &[StressResult]) -> BTreeMap<String, BTreeMap<Symbol, Decimal>> {
    results
        .iter()
        .map(|r| (r.scenario_name.clone(), r.symbol_pnl.clone()))
        .collect()
}

/// Result with the largest loss.
#[must_use]
pub fn worst_case(results: &[StressResult]) -> Option<&StressResult> {
    results.iter().min_by(|a, b| a.total_pnl.cmp(&b.total_pnl))
}

/// Result with the largest gain.
#[must_use]
pub fn best_case(results: &[StressResult]) -> Option<&StressResult> {
    results.iter().max_by(|a, b| a.total_pnl.cmp(&b.total_pnl))
}

/// Summary of several stress results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressSummary {
    /// Number of scenarios.
    pub scenario_count: usize,
    /// Scenarios ending in a loss.
    pub loss_count: usize,
    /// Scenarios ending in a gain.
    pub gain_count: usize,
    /// Worst scenario name and its P&L.
    pub worst: Option<(String, Decimal)>,
    /// Best scenario name and its P&L.
    pub best: Option<(String, Decimal)>,
    /// Mean P&L across scenarios, rounded to cents.
    pub average_pnl: Decimal,
}

/// Summarizes stress results.
#[must_use]
pub fn summarize_results(results: &[StressResult]) -> StressSummary {
    let average_pnl = if results.is_empty() {
        Decimal::ZERO
    } else {
        let total: Decimal = results.iter().map(|r| r.total_pnl).sum();
        (total / Decimal::from(results.len())).round_dp(2)
    };

    StressSummary {
        scenario_count: results.len(),
        loss_count: results.iter().filter(|r| r.is_loss()).count(),
        gain_count: results.iter().filter(|r| r.is_gain()).count(),
        worst: worst_case(results).map(|r| (r.scenario_name.clone(), r.total_pnl)),
        best: best_case(results).map(|r| (r.scenario_name.clone(), r.total_pnl)),
        average_pnl,
    }
}
