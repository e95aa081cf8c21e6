//! Historical return series.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{SamplingFrequency, Symbol};
use crate::error::{AnalyticsError, AnalyticsResult};

/// Ordered periodic returns for one symbol.
///
/// Returns are dimensionless fractional changes (`-0.01` is a 1% loss), stored
/// oldest first. Statistics run in `f64`; money never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    /// Symbol the returns belong to.
    pub symbol: Symbol,

    /// Periodic returns in chronological order.
    pub returns: Vec<f64>,

    /// Sampling frequency of the observations.
    #[serde(default)]
    pub frequency: SamplingFrequency,

    /// Timestamp of the most recent observation.
    pub as_of: DateTime<Utc>,
}

impl ReturnSeries {
    /// Creates a series stamped with the current time.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, returns: Vec<f64>, frequency: SamplingFrequency) -> Self {
        Self {
            symbol: symbol.into(),
            returns,
            frequency,
            as_of: Utc::now(),
        }
    }

    /// Sets the timestamp of the most recent observation.
    #[must_use]
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Builds simple returns `p[t] / p[t-1] - 1` from a price series.
    pub fn from_prices(
        symbol: impl Into<Symbol>,
        prices: &[Decimal],
        frequency: SamplingFrequency,
    ) -> AnalyticsResult<Self> {
        let symbol = symbol.into();
        if prices.len() < 2 {
            return Err(AnalyticsError::insufficient_data(
                format!("returns from prices for {symbol}"),
                2,
                prices.len(),
            ));
        }

        let mut returns = Vec::with_capacity(prices.len() - 1);
        for pair in prices.windows(2) {
            if pair[0] <= Decimal::ZERO {
                return Err(AnalyticsError::invalid_parameter(
                    "price",
                    pair[0],
                    format!("prices for {symbol} must be positive"),
                ));
            }
            let ret = (pair[1] - pair[0]) / pair[0];
            returns.push(ret.to_f64().unwrap_or(0.0));
        }

        Ok(Self::new(symbol, returns, frequency))
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Returns true when there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// The most recent `lookback` observations (all of them if shorter).
    #[must_use]
    pub fn tail(&self, lookback: usize) -> Self {
        let start = self.returns.len().saturating_sub(lookback);
        Self {
            symbol: self.symbol.clone(),
            returns: self.returns[start..].to_vec(),
            frequency: self.frequency,
            as_of: self.as_of,
        }
    }

    /// Checks the series holds at least `required` finite observations.
    pub fn ensure_usable(&self, required: usize, context: &str) -> AnalyticsResult<()> {
        let required = required.max(1);
        if self.returns.len() < required {
            return Err(AnalyticsError::insufficient_data(
                format!("{context} ({})", self.symbol),
                required,
                self.returns.len(),
            ));
        }
        if let Some(bad) = self.returns.iter().find(|r| !r.is_finite()) {
            return Err(AnalyticsError::invalid_parameter(
                "returns",
                bad,
                format!("series for {} contains a non-finite return", self.symbol),
            ));
        }
        Ok(())
    }
}
