//! Frontier command implementation.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use keel_config::RiskSettings;
use keel_core::CancellationToken;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::{build_engine, select_symbols};
use crate::input::load_series;
use crate::output::{format_weights, print_header, print_json, print_table};

/// Arguments for the frontier command.
#[derive(Args, Debug)]
pub struct FrontierArgs {
    /// Return series file (JSON)
    #[arg(long)]
    pub returns: PathBuf,

    /// Comma-separated symbols. Defaults to every series in the file.
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Most recent observations to use. Defaults to the VaR lookback.
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Number of frontier points. Defaults to the optimizer setting.
    #[arg(long)]
    pub points: Option<usize>,
}

/// One frontier point for display.
#[derive(Debug, Tabled)]
struct FrontierRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Return")]
    expected_return: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Weights")]
    weights: String,
}

/// Execute the frontier command.
pub async fn execute(
    args: FrontierArgs,
    settings: &RiskSettings,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let series = load_series(&args.returns, Utc::now())?;
    let symbols = select_symbols(&series, &args.symbols)?;
    let lookback = args.lookback.unwrap_or(settings.var.returns_lookback);
    let points = args.points.unwrap_or(settings.optimizer.frontier_points);

    let engine = build_engine(settings, series, None)?;
    let frontier = engine
        .calculate_efficient_frontier(&symbols, lookback, points, cancel)
        .await?;

    match format {
        OutputFormat::Json => print_json(&frontier),
        OutputFormat::Table => {
            print_header("Efficient Frontier");
            let rows: Vec<FrontierRow> = frontier
                .iter()
                .enumerate()
                .map(|(i, point)| FrontierRow {
                    index: i + 1,
                    expected_return: format!("{:.4}%", point.expected_return * 100.0),
                    risk: format!("{:.4}%", point.risk * 100.0),
                    weights: format_weights(&point.weights),
                })
                .collect();
            print_table(&rows)
        }
    }
}
