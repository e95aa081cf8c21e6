//! VaR command implementation.
//!
//! Calculates Value at Risk and Conditional VaR of a position book or a
//! weighted portfolio.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use keel_config::RiskSettings;
use keel_core::CancellationToken;
use keel_var::{MonteCarloParams, SimulationDistribution, VaRMethod, VaRRequest};
use rust_decimal::Decimal;

use crate::cli::OutputFormat;
use crate::commands::build_engine;
use crate::error::CliError;
use crate::input::{load_book, load_series, load_weights};
use crate::output::{print_report, KeyValue};

/// Estimation method.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Historical simulation
    Historical,
    /// Variance-covariance
    Parametric,
    /// Monte Carlo simulation
    MonteCarlo,
}

/// Arguments for the var command.
#[derive(Args, Debug)]
pub struct VarArgs {
    /// Return series file (JSON)
    #[arg(long)]
    pub returns: PathBuf,

    /// Position book file (JSON); positions are weighted by market value
    #[arg(long, required_unless_present = "weights", conflicts_with = "weights")]
    pub positions: Option<PathBuf>,

    /// Weights file (JSON); requires --value
    #[arg(long, requires = "value")]
    pub weights: Option<PathBuf>,

    /// Portfolio value. Defaults to the book value.
    #[arg(long)]
    pub value: Option<Decimal>,

    /// Confidence level in (0, 1)
    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// Horizon in days
    #[arg(long, default_value = "1")]
    pub horizon: u32,

    /// Estimation method
    #[arg(long, value_enum, default_value = "historical")]
    pub method: MethodArg,

    /// Number of Monte Carlo simulations
    #[arg(long, default_value = "10000")]
    pub simulations: u32,

    /// Monte Carlo seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Draw Student-t returns with these degrees of freedom (Monte Carlo only)
    #[arg(long)]
    pub student_t: Option<f64>,
}

impl VarArgs {
    fn method(&self) -> VaRMethod {
        match self.method {
            MethodArg::Historical => VaRMethod::Historical,
            MethodArg::Parametric => VaRMethod::Parametric,
            MethodArg::MonteCarlo => {
                let params = MonteCarloParams::new(self.simulations, self.seed);
                VaRMethod::MonteCarlo(match self.student_t {
                    Some(degrees_of_freedom) => params
                        .with_distribution(SimulationDistribution::StudentT { degrees_of_freedom }),
                    None => params,
                })
            }
        }
    }
}

/// Execute the var command.
pub async fn execute(
    args: VarArgs,
    settings: &RiskSettings,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let now = Utc::now();
    let series = load_series(&args.returns, now)?;
    let method = args.method();

    let result = match (&args.positions, &args.weights) {
        (Some(path), _) => {
            let book = load_book(path, now)?;
            let engine = build_engine(settings, series, Some(book))?;
            let value = match args.value {
                Some(value) => value,
                None => engine.portfolio_value().await?,
            };
            let request = VaRRequest::new(args.confidence, args.horizon, value, method);
            engine.calculate_var(request, cancel).await?
        }
        (None, Some(path)) => {
            let weights = load_weights(path)?;
            let value = args
                .value
                .ok_or_else(|| CliError::InvalidInput("--weights requires --value".into()))?;
            let engine = build_engine(settings, series, None)?;
            let request = VaRRequest::new(args.confidence, args.horizon, value, method);
            engine
                .calculate_var_for_weights(request, &weights, cancel)
                .await?
        }
        (None, None) => {
            return Err(
                CliError::InvalidInput("either --positions or --weights is required".into()).into(),
            )
        }
    };

    let rows = vec![
        KeyValue::new("Method", result.method),
        KeyValue::new(
            "Confidence",
            format!("{:.2}%", result.confidence_level * 100.0),
        ),
        KeyValue::new("Horizon (days)", result.horizon_days),
        KeyValue::new("Observations", result.sample_size),
        KeyValue::from_money("VaR", result.var),
        KeyValue::from_money("CVaR", result.cvar),
    ];
    print_report("Value at Risk", &rows, &result, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: VarArgs,
    }

    #[test]
    fn test_monte_carlo_student_t() {
        let harness = Harness::parse_from([
            "var",
            "--returns",
            "r.json",
            "--positions",
            "p.json",
            "--method",
            "monte-carlo",
            "--simulations",
            "5000",
            "--student-t",
            "4",
        ]);
        match harness.args.method() {
            VaRMethod::MonteCarlo(params) => {
                assert_eq!(params.simulations, 5000);
                assert_eq!(params.seed, 42);
                assert_eq!(
                    params.distribution,
                    SimulationDistribution::StudentT {
                        degrees_of_freedom: 4.0
                    }
                );
            }
            other => panic!("unexpected method {other}"),
        }
    }

    #[test]
    fn test_positions_or_weights_required() {
        assert!(Harness::try_parse_from(["var", "--returns", "r.json"]).is_err());
        assert!(Harness::try_parse_from([
            "var", "--returns", "r.json", "--weights", "w.json"
        ])
        .is_err());
        assert!(Harness::try_parse_from([
            "var", "--returns", "r.json", "--weights", "w.json", "--value", "1000"
        ])
        .is_ok());
    }
}
