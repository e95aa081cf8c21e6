//! # Keel Traits
//!
//! Interfaces to the collaborators the Keel risk engine consumes.
//!
//! This crate contains ONLY trait definitions. Implementations live with the
//! caller (an in-memory one ships with `keel-engine`).
//!
//! ## Module Structure
//!
//! - [`returns`]: Historical return series per symbol
//! - [`positions`]: Open position snapshots and portfolio value
//! - [`config`]: Margin configuration
//!
//! ## Dependency Injection
//!
//! The risk engine receives these traits as trait objects:
//!
//! ```ignore
//! RiskEngineBuilder::new()
//!     .with_returns(Arc<dyn ReturnSeriesSource>)
//!     .with_positions(Arc<dyn PositionSource>)
//!     .with_margin_config(Arc<dyn MarginConfigSource>)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod positions;
pub mod returns;

pub use config::MarginConfigSource;
pub use error::SourceError;
pub use positions::PositionSource;
pub use returns::ReturnSeriesSource;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keel_core::{ReturnSeries, SamplingFrequency, Symbol};

    struct Fixed;

    #[async_trait]
    impl ReturnSeriesSource for Fixed {
        async fn get_return_series(
            &self,
            symbol: &Symbol,
            lookback: usize,
        ) -> Result<ReturnSeries, SourceError> {
            if symbol.as_str() == "MISSING" {
                return Err(SourceError::not_found(symbol.to_string()));
            }
            Ok(ReturnSeries::new(
                symbol.clone(),
                vec![0.01; lookback],
                SamplingFrequency::Daily,
            ))
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let symbols = vec![Symbol::new("ETH-USD"), Symbol::new("BTC-USD")];
        let series = Fixed.get_return_series_batch(&symbols, 5).await.unwrap();
        assert_eq!(series[0].symbol, symbols[0]);
        assert_eq!(series[1].symbol, symbols[1]);
        assert_eq!(series[1].len(), 5);
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_error() {
        let symbols = vec![Symbol::new("BTC-USD"), Symbol::new("MISSING")];
        let err = Fixed.get_return_series_batch(&symbols, 5).await.unwrap_err();
        assert_eq!(err, SourceError::NotFound("MISSING".into()));
    }
}
