//! In-memory implementation of every collaborator interface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use keel_config::MarginConfig;
use keel_core::{Portfolio, Position, ReturnSeries, Symbol};
use keel_traits::{MarginConfigSource, PositionSource, ReturnSeriesSource, SourceError};
use parking_lot::RwLock;
use rust_decimal::Decimal;

/// Return series, positions and margin configuration held in memory.
///
/// Used by tests and the command-line tool; a deployment supplies its own
/// repository-backed sources.
#[derive(Debug)]
pub struct InMemorySource {
    series: RwLock<BTreeMap<Symbol, ReturnSeries>>,
    portfolio: RwLock<Portfolio>,
    margin: RwLock<MarginConfig>,
}

impl InMemorySource {
    /// Creates an empty source serving `margin`.
    pub fn new(margin: MarginConfig) -> Self {
        Self {
            series: RwLock::new(BTreeMap::new()),
            portfolio: RwLock::new(Portfolio::new()),
            margin: RwLock::new(margin),
        }
    }

    /// Stores or replaces the return series of its symbol.
    pub fn insert_series(&self, series: ReturnSeries) {
        self.series.write().insert(series.symbol.clone(), series);
    }

    /// Stores or replaces a position snapshot.
    pub fn insert_position(&self, position: Position) {
        self.portfolio.write().insert(position);
    }

    /// Removes a position, ending its lifetime.
    pub fn remove_position(&self, symbol: &Symbol) -> Option<Position> {
        self.portfolio.write().remove(symbol)
    }

    /// Sets uninvested cash.
    pub fn set_cash(&self, cash: Decimal) {
        self.portfolio.write().cash = cash;
    }

    /// Replaces the margin configuration.
    pub fn set_margin_config(&self, margin: MarginConfig) {
        *self.margin.write() = margin;
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new(MarginConfig::standard())
    }
}

#[async_trait]
impl ReturnSeriesSource for InMemorySource {
    async fn get_return_series(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<ReturnSeries, SourceError> {
        self.series
            .read()
            .get(symbol)
            .map(|s| s.tail(lookback))
            .ok_or_else(|| SourceError::not_found(format!("return series for {symbol}")))
    }
}

#[async_trait]
impl PositionSource for InMemorySource {
    async fn get_positions(&self) -> Result<Vec<Position>, SourceError> {
        Ok(self.portfolio.read().iter().cloned().collect())
    }

    async fn get_portfolio_value(&self) -> Result<Decimal, SourceError> {
        Ok(self.portfolio.read().total_value())
    }
}

#[async_trait]
impl MarginConfigSource for InMemorySource {
    async fn get_margin_config(&self) -> Result<MarginConfig, SourceError> {
        Ok(self.margin.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::SamplingFrequency;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_series_lookback_and_missing_symbol() {
        let source = InMemorySource::default();
        source.insert_series(ReturnSeries::new(
            "BTC-USD",
            vec![0.01, -0.02, 0.03, 0.00],
            SamplingFrequency::Daily,
        ));

        let series = source
            .get_return_series(&Symbol::new("BTC-USD"), 2)
            .await
            .unwrap();
        assert_eq!(series.returns, vec![0.03, 0.00]);

        let err = source
            .get_return_series(&Symbol::new("ETH-USD"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_portfolio_value_includes_cash() {
        let source = InMemorySource::default();
        source.insert_position(
            Position::builder("ETH-USD")
                .quantity(dec!(2))
                .entry_price(dec!(3000))
                .build()
                .unwrap(),
        );
        source.set_cash(dec!(500));

        assert_eq!(source.get_portfolio_value().await.unwrap(), dec!(6500));
        assert_eq!(source.get_positions().await.unwrap().len(), 1);

        source.remove_position(&Symbol::new("ETH-USD"));
        assert!(source.get_positions().await.unwrap().is_empty());
    }
}
