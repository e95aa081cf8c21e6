//! CLI command implementations.

pub mod frontier;
pub mod liquidation;
pub mod optimize;
pub mod rebalance;
pub mod stress;
pub mod var;

// Re-export submodules for convenience
pub use frontier::FrontierArgs;
pub use liquidation::LiquidationArgs;
pub use optimize::OptimizeArgs;
pub use rebalance::RebalanceArgs;
pub use stress::StressArgs;
pub use var::VarArgs;

use std::sync::Arc;

use keel_config::RiskSettings;
use keel_core::{ReturnSeries, Symbol};
use keel_engine::{InMemorySource, RiskEngine, RiskEngineBuilder};

use crate::error::{CliError, CliResult};
use crate::input::Book;

/// Builds an engine over in-memory copies of the loaded inputs.
pub fn build_engine(
    settings: &RiskSettings,
    series: Vec<ReturnSeries>,
    book: Option<Book>,
) -> anyhow::Result<RiskEngine> {
    let source = Arc::new(InMemorySource::new(settings.margin.clone()));
    for s in series {
        source.insert_series(s);
    }
    if let Some(book) = book {
        for position in book.positions {
            source.insert_position(position);
        }
        source.set_cash(book.cash);
    }

    Ok(RiskEngineBuilder::new()
        .with_sources(source)
        .with_settings(settings.clone())
        .build()?)
}

/// Selects the requested symbols, or every loaded one when none are named.
pub fn select_symbols(series: &[ReturnSeries], requested: &[String]) -> CliResult<Vec<Symbol>> {
    if requested.is_empty() {
        return Ok(series.iter().map(|s| s.symbol.clone()).collect());
    }

    requested
        .iter()
        .map(|name| {
            let symbol = Symbol::new(name.trim());
            if series.iter().any(|s| s.symbol == symbol) {
                Ok(symbol)
            } else {
                Err(CliError::InvalidInput(format!("no return series for {symbol}")))
            }
        })
        .collect()
}
