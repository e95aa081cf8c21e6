//! Liquidation command implementation.
//!
//! Computes the liquidation price of a single leveraged position, or the
//! margin state of every position in a book.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use keel_config::RiskSettings;
use keel_core::PositionSide;
use keel_engine::MarginStatus;
use keel_margin::{health_at_liquidation, liquidation_price, DebtSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::build_engine;
use crate::error::CliError;
use crate::input::load_book;
use crate::output::{
    format_money, format_percent, print_json, print_report, print_table, KeyValue,
};

/// Position direction.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    /// Long position
    Long,
    /// Short position
    Short,
}

impl From<SideArg> for PositionSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Long => PositionSide::Long,
            SideArg::Short => PositionSide::Short,
        }
    }
}

/// Arguments for the liquidation command.
#[derive(Args, Debug)]
pub struct LiquidationArgs {
    /// Position book file (JSON); reports every position's margin state
    #[arg(long, conflicts_with_all = ["entry_price", "leverage"])]
    pub positions: Option<PathBuf>,

    /// Entry price of a single position
    #[arg(long, required_unless_present = "positions")]
    pub entry_price: Option<Decimal>,

    /// Leverage of a single position
    #[arg(long, required_unless_present = "positions")]
    pub leverage: Option<Decimal>,

    /// Position direction
    #[arg(long, value_enum, default_value = "long")]
    pub side: SideArg,

    /// Maintenance margin rate. Defaults to the configured rate.
    #[arg(long)]
    pub maintenance_margin_rate: Option<Decimal>,
}

#[derive(Debug, Tabled)]
struct StatusRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Health Ratio")]
    health_ratio: String,
    #[tabled(rename = "Liquidation Price")]
    liquidation_price: String,
}

#[derive(Debug, Serialize)]
struct MarginReport {
    positions: Vec<MarginStatus>,
    account: DebtSummary,
}

/// Execute the liquidation command.
pub async fn execute(
    args: LiquidationArgs,
    settings: &RiskSettings,
    format: OutputFormat,
) -> Result<()> {
    match &args.positions {
        Some(path) => book_report(path, settings, format).await,
        None => single_position(&args, settings, format),
    }
}

fn single_position(
    args: &LiquidationArgs,
    settings: &RiskSettings,
    format: OutputFormat,
) -> Result<()> {
    let (entry_price, leverage) = match (args.entry_price, args.leverage) {
        (Some(entry), Some(leverage)) => (entry, leverage),
        _ => {
            return Err(
                CliError::InvalidInput("--entry-price and --leverage are required".into()).into(),
            )
        }
    };
    let rate = args
        .maintenance_margin_rate
        .unwrap_or(settings.margin.maintenance_margin_rate);
    let side = PositionSide::from(args.side);
    let price = liquidation_price(side, entry_price, leverage, rate)?;
    let distance = (price - entry_price) / entry_price;
    let health_at_price = health_at_liquidation(side, leverage, rate)?;

    let report = serde_json::json!({
        "side": side,
        "entry_price": entry_price,
        "leverage": leverage,
        "maintenance_margin_rate": rate,
        "liquidation_price": price,
        "distance": distance,
        "health_ratio_at_liquidation": health_at_price,
        "liquidation_floor": settings.margin.liquidation_floor,
    });
    let rows = vec![
        KeyValue::new("Side", format!("{side:?}")),
        KeyValue::from_money("Entry price", entry_price),
        KeyValue::new("Leverage", format!("{leverage}x")),
        KeyValue::new("Maintenance margin rate", format_percent(rate)),
        KeyValue::from_money("Liquidation price", price),
        KeyValue::new("Distance from entry", format_percent(distance)),
        KeyValue::new("Health ratio at liquidation", health_at_price.round_dp(4)),
        KeyValue::new("Liquidation floor", settings.margin.liquidation_floor),
    ];
    print_report("Liquidation Price", &rows, &report, format)
}

async fn book_report(
    path: &Path,
    settings: &RiskSettings,
    format: OutputFormat,
) -> Result<()> {
    let book = load_book(path, Utc::now())?;
    let engine = build_engine(settings, Vec::new(), Some(book))?;
    let positions = engine.evaluate_margin().await?;
    let account = engine.get_debt_summary().await?;

    if let OutputFormat::Json = format {
        return print_json(&MarginReport { positions, account });
    }

    let rows = vec![
        KeyValue::from_money("Collateral", account.total_collateral),
        KeyValue::from_money("Borrowed", account.total_borrowed),
        KeyValue::from_money("Accrued interest", account.total_accrued_interest),
        KeyValue::from_money("Equity", account.total_equity),
        KeyValue::from_money("Maintenance margin", account.maintenance_margin),
        KeyValue::new(
            "Health ratio",
            account
                .margin_health_ratio
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r)),
        ),
        KeyValue::new("Margin call", account.margin_call),
    ];
    print_report("Account Margin", &rows, &account, format)?;

    let statuses: Vec<StatusRow> = positions
        .iter()
        .map(|s| StatusRow {
            symbol: s.symbol.to_string(),
            state: s.state.to_string(),
            health_ratio: s
                .health_ratio
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r)),
            liquidation_price: format_money(s.liquidation_price),
        })
        .collect();
    println!();
    print_table(&statuses)
}
