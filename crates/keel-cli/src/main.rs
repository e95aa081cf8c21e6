//! Keel CLI - Command-line interface for risk and portfolio analytics.
//!
//! # Usage
//!
//! ```bash
//! # Value at Risk of a position file
//! keel var --returns returns.json --positions book.json --method historical
//!
//! # Efficient frontier over every series in a file
//! keel frontier --returns returns.json --points 10
//!
//! # Rebalance a book to target weights
//! keel rebalance --positions book.json --target weights.json
//!
//! # Standard stress scenarios
//! keel stress --positions book.json
//!
//! # Liquidation price of a 10x long
//! keel liquidation --entry-price 50000 --leverage 10 --side long
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use anyhow::{Context, Result};
use clap::Parser;
use keel_config::RiskSettings;
use keel_core::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod input;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,keel=debug,keel_engine=debug,keel_var=debug,keel_portfolio=debug,keel_margin=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match &cli.config {
        Some(path) => RiskSettings::from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => RiskSettings::standard(),
    };

    // Ctrl-C cancels the running computation
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let format = cli.format;
    match cli.command {
        Commands::Var(args) => commands::var::execute(args, &settings, format, &cancel).await?,
        Commands::Frontier(args) => {
            commands::frontier::execute(args, &settings, format, &cancel).await?
        }
        Commands::Optimize(args) => {
            commands::optimize::execute(args, &settings, format, &cancel).await?
        }
        Commands::Rebalance(args) => commands::rebalance::execute(args, &settings, format).await?,
        Commands::Stress(args) => commands::stress::execute(args, &settings, format, &cancel).await?,
        Commands::Liquidation(args) => commands::liquidation::execute(args, &settings, format).await?,
    }

    Ok(())
}
