//! Return series source.

use async_trait::async_trait;
use keel_core::{ReturnSeries, Symbol};

use crate::error::SourceError;

/// Supplies historical return series.
#[async_trait]
pub trait ReturnSeriesSource: Send + Sync {
    /// Most recent `lookback` returns of `symbol`, oldest first.
    async fn get_return_series(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<ReturnSeries, SourceError>;

    /// Series for several symbols, in the order requested.
    ///
    /// The default fetches one symbol at a time.
    async fn get_return_series_batch(
        &self,
        symbols: &[Symbol],
        lookback: usize,
    ) -> Result<Vec<ReturnSeries>, SourceError> {
        let mut series = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            series.push(self.get_return_series(symbol, lookback).await?);
        }
        Ok(series)
    }
}
