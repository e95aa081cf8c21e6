//! Stress command implementation.
//!
//! Applies price shock scenarios to a position book.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use keel_config::RiskSettings;
use keel_core::CancellationToken;
use keel_portfolio::stress::{standard, summarize_results};
use keel_portfolio::{StressResult, StressSummary};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::build_engine;
use crate::input::{load_book, load_scenarios};
use crate::output::{format_money, print_header, print_json, print_table};

/// Arguments for the stress command.
#[derive(Args, Debug)]
pub struct StressArgs {
    /// Position book file (JSON)
    #[arg(long)]
    pub positions: PathBuf,

    /// Scenario file (JSON). Defaults to the standard scenarios.
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Show P&L per symbol
    #[arg(long)]
    pub detail: bool,
}

#[derive(Debug, Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "P&L")]
    pnl: String,
    #[tabled(rename = "P&L %")]
    pnl_pct: String,
    #[tabled(rename = "Stressed Value")]
    stressed_value: String,
}

#[derive(Debug, Tabled)]
struct SymbolRow {
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "P&L")]
    pnl: String,
}

#[derive(Debug, Serialize)]
struct StressReport<'a> {
    results: &'a [StressResult],
    summary: StressSummary,
}

/// Execute the stress command.
pub async fn execute(
    args: StressArgs,
    settings: &RiskSettings,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let book = load_book(&args.positions, Utc::now())?;
    let scenarios = match &args.scenarios {
        Some(path) => load_scenarios(path)?,
        None => standard::all(),
    };

    let positions = book.positions.clone();
    let engine = build_engine(settings, Vec::new(), Some(book))?;
    let results = engine.run_stress_test(&positions, &scenarios, cancel).await?;
    let summary = summarize_results(&results);

    if let OutputFormat::Json = format {
        return print_json(&StressReport {
            results: &results,
            summary,
        });
    }

    print_header("Stress Test");
    let rows: Vec<ScenarioRow> = results
        .iter()
        .map(|r| ScenarioRow {
            scenario: r.scenario_name.clone(),
            pnl: format_money(r.total_pnl),
            pnl_pct: format!("{:.2}%", r.pnl_pct),
            stressed_value: format_money(r.stressed_value),
        })
        .collect();
    print_table(&rows)?;

    if args.detail {
        let detail: Vec<SymbolRow> = results
            .iter()
            .flat_map(|r| {
                r.symbol_pnl.iter().map(|(symbol, pnl)| SymbolRow {
                    scenario: r.scenario_name.clone(),
                    symbol: symbol.to_string(),
                    pnl: format_money(*pnl),
                })
            })
            .collect();
        println!();
        print_table(&detail)?;
    }

    if let Some((name, pnl)) = &summary.worst {
        println!(
            "\nWorst case: {name} ({}); {} of {} scenarios lose money",
            format_money(*pnl),
            summary.loss_count,
            summary.scenario_count
        );
    }
    Ok(())
}
