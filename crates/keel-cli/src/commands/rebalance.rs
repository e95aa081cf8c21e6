//! Rebalance command implementation.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use keel_config::RiskSettings;
use keel_portfolio::RebalanceTrade;
use rust_decimal::Decimal;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::build_engine;
use crate::input::{load_book, load_weights};
use crate::output::{format_money, print_json, print_report, print_table, KeyValue};

/// Arguments for the rebalance command.
#[derive(Args, Debug)]
pub struct RebalanceArgs {
    /// Position book file (JSON)
    #[arg(long)]
    pub positions: PathBuf,

    /// Target weights file (JSON)
    #[arg(long)]
    pub target: PathBuf,

    /// Total value to allocate. Defaults to the book value including cash.
    #[arg(long)]
    pub total_value: Option<Decimal>,
}

#[derive(Debug, Tabled)]
struct TradeRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Delta")]
    delta: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl TradeRow {
    fn new(trade: &RebalanceTrade, status: &'static str) -> Self {
        Self {
            symbol: trade.symbol.to_string(),
            side: trade.side.to_string(),
            current: format_money(trade.current_value),
            target: format_money(trade.target_value),
            delta: format_money(trade.delta),
            status,
        }
    }
}

/// Execute the rebalance command.
pub async fn execute(
    args: RebalanceArgs,
    settings: &RiskSettings,
    format: OutputFormat,
) -> Result<()> {
    let book = load_book(&args.positions, Utc::now())?;
    let target = load_weights(&args.target)?;

    let plan = match args.total_value {
        Some(total_value) => {
            let positions = book.positions.clone();
            let engine = build_engine(settings, Vec::new(), Some(book))?;
            engine.rebalancing_plan(&positions, &target, total_value)?
        }
        None => {
            let engine = build_engine(settings, Vec::new(), Some(book))?;
            engine.rebalance_to(&target).await?
        }
    };

    if let OutputFormat::Json = format {
        return print_json(&plan);
    }

    let rows = vec![
        KeyValue::from_money("Total value", plan.total_value),
        KeyValue::new("Trades", plan.trade_count()),
        KeyValue::new("Skipped", plan.skipped.len()),
        KeyValue::from_money("Turnover", plan.turnover),
    ];
    print_report("Rebalancing Plan", &rows, &plan, format)?;

    let trades: Vec<TradeRow> = plan
        .trades
        .iter()
        .map(|t| TradeRow::new(t, "trade"))
        .chain(plan.skipped.iter().map(|t| TradeRow::new(t, "below minimum")))
        .collect();
    println!();
    print_table(&trades)
}
