//! JSON input files.
//!
//! File snapshots carry no reliable timestamp, so every loaded series and
//! position is stamped with the load time before it reaches the engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use keel_core::{MarginType, Position, ReturnSeries, SamplingFrequency, Symbol, Weights};
use keel_portfolio::StressScenario;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// Return series file.
///
/// ```json
/// { "frequency": "Daily", "returns": { "BTC-USD": [0.01, -0.02] } }
/// ```
///
/// `prices` may be given instead of (or alongside) `returns`; prices are
/// converted to simple returns.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesFile {
    #[serde(default)]
    frequency: SamplingFrequency,
    #[serde(default)]
    returns: BTreeMap<Symbol, Vec<f64>>,
    #[serde(default)]
    prices: BTreeMap<Symbol, Vec<Decimal>>,
}

/// Position book file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookFile {
    #[serde(default)]
    cash: Decimal,
    positions: Vec<PositionInput>,
}

/// One position of a book file. Omitted fields take the builder defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PositionInput {
    symbol: Symbol,
    quantity: Decimal,
    entry_price: Decimal,
    current_price: Option<Decimal>,
    leverage: Option<Decimal>,
    margin_type: Option<MarginType>,
    collateral: Option<Decimal>,
    borrowed: Option<Decimal>,
    accrued_interest: Option<Decimal>,
}

impl PositionInput {
    fn into_position(self, now: DateTime<Utc>) -> CliResult<Position> {
        let mut builder = Position::builder(self.symbol)
            .quantity(self.quantity)
            .entry_price(self.entry_price)
            .updated_at(now);
        if let Some(price) = self.current_price {
            builder = builder.current_price(price);
        }
        if let Some(leverage) = self.leverage {
            builder = builder.leverage(leverage);
        }
        if let Some(margin_type) = self.margin_type {
            builder = builder.margin_type(margin_type);
        }
        if let Some(collateral) = self.collateral {
            builder = builder.collateral(collateral);
        }
        if let Some(borrowed) = self.borrowed {
            builder = builder.borrowed(borrowed);
        }
        if let Some(interest) = self.accrued_interest {
            builder = builder.accrued_interest(interest);
        }
        builder
            .build()
            .map_err(|e| CliError::InvalidInput(e.to_string()))
    }
}

/// Positions and cash loaded from a book file.
#[derive(Debug, Clone)]
pub struct Book {
    pub positions: Vec<Position>,
    pub cash: Decimal,
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str) -> CliResult<T> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

/// Loads every series of a return series file.
pub fn load_series(path: &Path, now: DateTime<Utc>) -> CliResult<Vec<ReturnSeries>> {
    let file: SeriesFile = read_json(path, "return series")?;
    let mut series = Vec::with_capacity(file.returns.len() + file.prices.len());

    for (symbol, prices) in file.prices {
        if file.returns.contains_key(&symbol) {
            return Err(CliError::InvalidInput(format!(
                "{symbol} has both returns and prices"
            )));
        }
        let converted = ReturnSeries::from_prices(symbol, &prices, file.frequency)
            .map_err(|e| CliError::InvalidInput(e.to_string()))?;
        series.push(converted.with_as_of(now));
    }
    for (symbol, returns) in file.returns {
        series.push(ReturnSeries::new(symbol, returns, file.frequency).with_as_of(now));
    }

    if series.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} contains no series",
            path.display()
        )));
    }
    series.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(series)
}

/// Loads a position book.
pub fn load_book(path: &Path, now: DateTime<Utc>) -> CliResult<Book> {
    let file: BookFile = read_json(path, "position book")?;
    let positions = file
        .positions
        .into_iter()
        .map(|p| p.into_position(now))
        .collect::<CliResult<Vec<_>>>()?;
    Ok(Book {
        positions,
        cash: file.cash,
    })
}

/// Loads a weight vector (`{"BTC-USD": 0.6, "ETH-USD": 0.4}`).
pub fn load_weights(path: &Path) -> CliResult<Weights> {
    read_json(path, "weights")
}

/// Loads a list of stress scenarios.
pub fn load_scenarios(path: &Path) -> CliResult<Vec<StressScenario>> {
    read_json(path, "stress scenario")
}
