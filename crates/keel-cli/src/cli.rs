//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{
    FrontierArgs, LiquidationArgs, OptimizeArgs, RebalanceArgs, StressArgs, VarArgs,
};

/// Keel - Risk & Portfolio Analytics
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Settings file (TOML or JSON). Defaults to the standard settings.
    #[arg(short, long, global = true, env = "KEEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Value at Risk and Conditional VaR of a portfolio
    Var(VarArgs),

    /// Efficient frontier of a set of assets
    Frontier(FrontierArgs),

    /// Maximum-Sharpe or minimum-variance portfolio
    Optimize(OptimizeArgs),

    /// Trades that move a book to target weights
    Rebalance(RebalanceArgs),

    /// Scenario P&L of a book
    Stress(StressArgs),

    /// Liquidation prices and margin health
    Liquidation(LiquidationArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    #[default]
    Table,
    /// JSON output
    Json,
}
