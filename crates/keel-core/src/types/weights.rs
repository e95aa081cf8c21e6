//! Portfolio weight vectors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Symbol;
use crate::error::{AnalyticsError, AnalyticsResult};

/// Symbol-to-weight mapping, ordered by symbol.
///
/// Weights are fractions of portfolio value. A normalized vector sums to one;
/// negative entries are short positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<Symbol, Decimal>);

impl Weights {
    /// Creates an empty weight vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight for a symbol, replacing any previous value.
    pub fn set(&mut self, symbol: impl Into<Symbol>, weight: Decimal) {
        self.0.insert(symbol.into(), weight);
    }

    /// Weight of a symbol, zero when absent.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Decimal {
        self.0.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Returns true if the symbol has an entry.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains_key(symbol)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Decimal)> {
        self.0.iter()
    }

    /// Symbols in order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.0.keys()
    }

    /// Herfindahl-Hirschman index: sum of squared weights.
    #[must_use]
    pub fn concentration(&self) -> Decimal {
        self.0.values().map(|w| w * w).sum()
    }

    /// Returns true if the weights sum to one within `tolerance`.
    #[must_use]
    pub fn is_normalized(&self, tolerance: Decimal) -> bool {
        (self.sum() - Decimal::ONE).abs() <= tolerance
    }

    /// Checks the vector is a valid allocation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the vector is empty, does not sum to one
    /// within `tolerance`, or holds a negative weight while shorting is
    /// disallowed.
    pub fn validate(&self, tolerance: Decimal, allow_short: bool) -> AnalyticsResult<()> {
        if self.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "weights",
                "{}",
                "weight vector is empty",
            ));
        }
        if !allow_short {
            if let Some((symbol, weight)) = self.0.iter().find(|(_, w)| w.is_sign_negative()) {
                return Err(AnalyticsError::invalid_parameter(
                    "weights",
                    weight,
                    format!("negative weight for {symbol} while shorting is disabled"),
                ));
            }
        }
        if !self.is_normalized(tolerance) {
            return Err(AnalyticsError::invalid_parameter(
                "weights",
                self.sum(),
                format!("weights must sum to 1 (tolerance {tolerance})"),
            ));
        }
        Ok(())
    }
}

impl FromIterator<(Symbol, Decimal)> for Weights {
    fn from_iter<I: IntoIterator<Item = (Symbol, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<Symbol, Decimal>> for Weights {
    fn from(map: BTreeMap<Symbol, Decimal>) -> Self {
        Self(map)
    }
}

impl<'a> IntoIterator for &'a Weights {
    type Item = (&'a Symbol, &'a Decimal);
    type IntoIter = std::collections::btree_map::Iter<'a, Symbol, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
