//! Collection of positions held by one account.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Position, Symbol, Weights};
use crate::error::{AnalyticsError, AnalyticsResult};

/// A set of positions keyed by symbol, plus uninvested cash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Positions by symbol.
    pub positions: BTreeMap<Symbol, Position>,

    /// Uninvested cash.
    #[serde(default)]
    pub cash: Decimal,
}

impl Portfolio {
    /// Creates an empty portfolio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a portfolio from positions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when two positions share a symbol. Entry
    /// price and leverage cannot be combined without losing one of them, so
    /// the caller has to net them first.
    pub fn from_positions(positions: impl IntoIterator<Item = Position>) -> AnalyticsResult<Self> {
        let mut portfolio = Self::new();
        for position in positions {
            if portfolio.positions.contains_key(&position.symbol) {
                return Err(AnalyticsError::invalid_parameter(
                    "positions",
                    &position.symbol,
                    "duplicate symbol in portfolio",
                ));
            }
            portfolio.insert(position);
        }
        Ok(portfolio)
    }

    /// Sets the uninvested cash.
    #[must_use]
    pub fn with_cash(mut self, cash: Decimal) -> Self {
        self.cash = cash;
        self
    }

    /// Inserts or replaces a position, returning the previous one.
    pub fn insert(&mut self, position: Position) -> Option<Position> {
        self.positions.insert(position.symbol.clone(), position)
    }

    /// Removes a position.
    pub fn remove(&mut self, symbol: &Symbol) -> Option<Position> {
        self.positions.remove(symbol)
    }

    /// Looks up a position.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Iterates positions in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Number of positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no positions are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Signed market value per symbol.
    #[must_use]
    pub fn market_values(&self) -> BTreeMap<Symbol, Decimal> {
        self.positions
            .iter()
            .map(|(s, p)| (s.clone(), p.market_value()))
            .collect()
    }

    /// Net market value of positions plus cash.
    #[must_use]
    pub fn total_value(&self) -> Decimal {
        self.positions.values().map(Position::market_value).sum::<Decimal>() + self.cash
    }

    /// Sum of absolute notionals.
    #[must_use]
    pub fn gross_exposure(&self) -> Decimal {
        self.positions.values().map(Position::notional).sum()
    }

    /// Sum of equity across positions.
    #[must_use]
    pub fn total_equity(&self) -> Decimal {
        self.positions.values().map(Position::equity).sum()
    }

    /// Current weights of each position in net market value (cash excluded).
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when the net market value is not positive.
    pub fn weights(&self) -> AnalyticsResult<Weights> {
        let total: Decimal = self.positions.values().map(Position::market_value).sum();
        if total <= Decimal::ZERO {
            return Err(AnalyticsError::invalid_parameter(
                "portfolio_value",
                total,
                "weights need a positive net market value",
            ));
        }
        Ok(self
            .positions
            .iter()
            .map(|(s, p)| (s.clone(), p.market_value() / total))
            .collect())
    }

    /// Timestamp of the stalest position snapshot.
    #[must_use]
    pub fn oldest_update(&self) -> Option<DateTime<Utc>> {
        self.positions.values().map(|p| p.updated_at).min()
    }
}
