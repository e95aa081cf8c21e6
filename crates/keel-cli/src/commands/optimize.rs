//! Optimize command implementation.
//!
//! Finds the maximum-Sharpe or minimum-variance portfolio.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use keel_config::RiskSettings;
use keel_core::CancellationToken;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::{build_engine, select_symbols};
use crate::input::load_series;
use crate::output::{format_percent, print_json, print_report, print_table, KeyValue};

/// Optimization objective.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Objective {
    /// Highest Sharpe ratio
    MaxSharpe,
    /// Lowest variance
    MinVariance,
}

/// Arguments for the optimize command.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Return series file (JSON)
    #[arg(long)]
    pub returns: PathBuf,

    /// Comma-separated symbols. Defaults to every series in the file.
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Most recent observations to use. Defaults to the VaR lookback.
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Optimization objective
    #[arg(long, value_enum, default_value = "max-sharpe")]
    pub objective: Objective,

    /// Risk-free rate, in the units of the expected returns
    #[arg(long, default_value = "0.0")]
    pub risk_free_rate: f64,
}

#[derive(Debug, Tabled)]
struct WeightRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

/// Execute the optimize command.
pub async fn execute(
    args: OptimizeArgs,
    settings: &RiskSettings,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let series = load_series(&args.returns, Utc::now())?;
    let symbols = select_symbols(&series, &args.symbols)?;
    let lookback = args.lookback.unwrap_or(settings.var.returns_lookback);

    let engine = build_engine(settings, series, None)?;
    let (title, result) = match args.objective {
        Objective::MaxSharpe => (
            "Maximum-Sharpe Portfolio",
            engine
                .calculate_max_sharpe_portfolio(&symbols, lookback, args.risk_free_rate, cancel)
                .await?,
        ),
        Objective::MinVariance => (
            "Minimum-Variance Portfolio",
            engine
                .calculate_minimum_variance_portfolio(&symbols, lookback)
                .await?,
        ),
    };

    if let OutputFormat::Json = format {
        return print_json(&result);
    }

    let rows = vec![
        KeyValue::new("Expected return", format!("{:.4}%", result.expected_return * 100.0)),
        KeyValue::new("Risk", format!("{:.4}%", result.risk * 100.0)),
        KeyValue::from_f64("Sharpe ratio", result.sharpe_ratio, 4),
        KeyValue::from_f64("Risk-free rate", result.risk_free_rate, 4),
    ];
    print_report(title, &rows, &result, format)?;

    let weights: Vec<WeightRow> = result
        .weights
        .iter()
        .map(|(symbol, weight)| WeightRow {
            symbol: symbol.to_string(),
            weight: format_percent(*weight),
        })
        .collect();
    println!();
    print_table(&weights)
}
