//! Rebalancing trade lists.
//!
//! The plan moves every symbol directly from its current value to its target
//! value, which is the minimum total traded value that reaches the target
//! exactly. Symbols held but absent from the target are fully exited.

use std::collections::BTreeMap;
use std::fmt;

use keel_config::RebalanceConfig;
use keel_core::{AnalyticsError, AnalyticsResult, Position, Symbol, Weights};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a rebalancing trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// Increase exposure.
    Buy,
    /// Reduce exposure.
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("BUY"),
            TradeSide::Sell => f.write_str("SELL"),
        }
    }
}

/// A single trade of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceTrade {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Current value held.
    pub current_value: Decimal,
    /// Value after the trade.
    pub target_value: Decimal,
    /// Signed value to trade (`target - current`).
    pub delta: Decimal,
    /// Buy or sell.
    pub side: TradeSide,
}

/// Trades moving a portfolio to its target weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePlan {
    /// Trades to execute, ordered by symbol.
    pub trades: Vec<RebalanceTrade>,
    /// Trades below the minimum trade value, not executed.
    pub skipped: Vec<RebalanceTrade>,
    /// Portfolio value the targets were applied to.
    pub total_value: Decimal,
    /// Sum of absolute deltas of executed trades.
    pub turnover: Decimal,
}

impl RebalancePlan {
    /// Signed delta per traded symbol.
    pub fn deltas(&self) -> BTreeMap<Symbol, Decimal> {
        self.trades
            .iter()
            .map(|t| (t.symbol.clone(), t.delta))
            .collect()
    }

    /// Returns true when nothing needs to be traded.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Number of executed trades.
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Builds [`RebalancePlan`]s.
#[derive(Debug, Clone, Default)]
pub struct Rebalancer {
    config: RebalanceConfig,
}

impl Rebalancer {
    /// Creates a rebalancer with the given settings.
    #[must_use]
    pub fn new(config: RebalanceConfig) -> Self {
        Self { config }
    }

    /// Plan from position snapshots; current values are market values.
    pub fn from_positions(
        &self,
        positions: &[Position],
        target: &Weights,
        total_value: Decimal,
    ) -> AnalyticsResult<RebalancePlan> {
        let mut current = BTreeMap::new();
        for p in positions {
            *current.entry(p.symbol.clone()).or_insert(Decimal::ZERO) += p.market_value();
        }
        self.plan(&current, target, total_value)
    }

    /// Plan from current weights applied to `total_value`.
    pub fn from_weights(
        &self,
        current: &Weights,
        target: &Weights,
        total_value: Decimal,
    ) -> AnalyticsResult<RebalancePlan> {
        let current = current
            .iter()
            .map(|(s, w)| (s.clone(), *w * total_value))
            .collect();
        self.plan(&current, target, total_value)
    }

    fn plan(
        &self,
        current: &BTreeMap<Symbol, Decimal>,
        target: &Weights,
        total_value: Decimal,
    ) -> AnalyticsResult<RebalancePlan> {
        if total_value <= Decimal::ZERO {
            return Err(AnalyticsError::invalid_parameter(
                "total_value",
                total_value,
                "must be positive",
            ));
        }
        target.validate(self.config.weight_tolerance, self.config.allow_short)?;

        let mut symbols: Vec<&Symbol> = current.keys().chain(target.symbols()).collect();
        symbols.sort();
        symbols.dedup();

        let mut trades = Vec::new();
        let mut skipped = Vec::new();
        for symbol in symbols {
            let current_value = current.get(symbol).copied().unwrap_or(Decimal::ZERO);
            let target_value = target.get(symbol) * total_value;
            let delta = target_value - current_value;
            if delta.is_zero() {
                continue;
            }

            let trade = RebalanceTrade {
                symbol: symbol.clone(),
                current_value,
                target_value,
                delta,
                side: if delta.is_sign_positive() {
                    TradeSide::Buy
                } else {
                    TradeSide::Sell
                },
            };
            match self.config.min_trade_value {
                Some(band) if delta.abs() < band => skipped.push(trade),
                _ => trades.push(trade),
            }
        }

        let turnover = trades.iter().map(|t| t.delta.abs()).sum();
        log::debug!(
            "rebalance: {} trades, {} skipped, turnover {}",
            trades.len(),
            skipped.len(),
            turnover
        );

        Ok(RebalancePlan {
            trades,
            skipped,
            total_value,
            turnover,
        })
    }
}
