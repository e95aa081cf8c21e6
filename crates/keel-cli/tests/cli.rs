//! End-to-end tests of the `keel` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn keel() -> Command {
    Command::cargo_bin("keel").unwrap()
}

fn returns(seed: usize) -> Vec<f64> {
    (0..60)
        .map(|i| (((i * 7 + seed) % 13) as f64 - 6.0) / 300.0)
        .collect()
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        fixture.write(
            "returns.json",
            &serde_json::json!({
                "frequency": "Daily",
                "returns": { "BTC-USD": returns(0), "ETH-USD": returns(5) }
            })
            .to_string(),
        );
        fixture.write(
            "book.json",
            r#"{
                "cash": 25000,
                "positions": [
                    { "symbol": "BTC-USD", "quantity": 1, "entry_price": 50000 },
                    { "symbol": "ETH-USD", "quantity": 10, "entry_price": 2500 }
                ]
            }"#,
        );
        fixture.write("target.json", r#"{ "BTC-USD": 0.25, "ETH-USD": 0.75 }"#);
        fixture
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_help() {
    keel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("liquidation"));
}

#[test]
fn test_liquidation_price_table() {
    keel()
        .args(["liquidation", "--entry-price", "50000", "--leverage", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("45250.00"));
}

#[test]
fn test_liquidation_reports_health_at_liquidation_price() {
    let value = json_output(keel().args([
        "--format",
        "json",
        "liquidation",
        "--entry-price",
        "50000",
        "--leverage",
        "10",
    ]));
    let health = value["health_ratio_at_liquidation"].as_f64().unwrap();
    assert!((health - 50000.0 / 45250.0).abs() < 1e-6);
    assert_eq!(value["liquidation_floor"].as_f64(), Some(1.0));
}

#[test]
fn test_liquidation_rejects_excessive_maintenance_rate() {
    keel()
        .args([
            "liquidation",
            "--entry-price",
            "50000",
            "--leverage",
            "10",
            "--maintenance-margin-rate",
            "0.2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("maintenance_margin_rate"));
}

#[test]
fn test_var_json() {
    let fx = Fixture::new();
    let value = json_output(
        keel()
            .args(["--format", "json", "var", "--returns"])
            .arg(fx.path("returns.json"))
            .arg("--positions")
            .arg(fx.path("book.json")),
    );

    let var = value["var"].as_f64().unwrap();
    let cvar = value["cvar"].as_f64().unwrap();
    assert!(var > 0.0);
    assert!(cvar >= var);
    assert_eq!(value["sample_size"].as_u64(), Some(60));
}

#[test]
fn test_var_respects_config_file() {
    let fx = Fixture::new();
    let config = fx.write(
        "settings.toml",
        r#"
[margin]
repayment_policy = "interest_first"

[var]
min_historical_observations = 100
returns_lookback = 250
"#,
    );

    keel()
        .arg("--config")
        .arg(&config)
        .arg("var")
        .arg("--returns")
        .arg(fx.path("returns.json"))
        .arg("--positions")
        .arg(fx.path("book.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Insufficient data"));
}

#[test]
fn test_rebalance_json() {
    let fx = Fixture::new();
    let plan = json_output(
        keel()
            .args(["rebalance", "--format", "json", "--positions"])
            .arg(fx.path("book.json"))
            .arg("--target")
            .arg(fx.path("target.json")),
    );

    assert_eq!(plan["total_value"].as_f64(), Some(100000.0));
    let delta = |symbol: &str| {
        plan["trades"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["symbol"] == symbol)
            .and_then(|t| t["delta"].as_f64())
    };
    assert_eq!(delta("BTC-USD"), Some(-25000.0));
    assert_eq!(delta("ETH-USD"), Some(50000.0));
}

#[test]
fn test_stress_standard_scenarios() {
    let fx = Fixture::new();
    let report = json_output(
        keel()
            .args(["--format", "json", "stress", "--positions"])
            .arg(fx.path("book.json")),
    );

    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0]["scenario_name"], "Market Crash");
    assert_eq!(results[0]["total_pnl"].as_f64(), Some(-22500.0));
    assert_eq!(report["summary"]["scenario_count"].as_u64(), Some(5));
}

#[test]
fn test_frontier_table() {
    let fx = Fixture::new();
    keel()
        .args(["frontier", "--points", "4", "--returns"])
        .arg(fx.path("returns.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Efficient Frontier"))
        .stdout(predicate::str::contains("BTC-USD"));
}

#[test]
fn test_unknown_symbol_rejected() {
    let fx = Fixture::new();
    keel()
        .args(["optimize", "--symbols", "SOL-USD", "--returns"])
        .arg(fx.path("returns.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no return series for SOL-USD"));
}

#[test]
fn test_missing_input_file() {
    keel()
        .args(["stress", "--positions"])
        .arg(Path::new("/nonexistent/book.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read"));
}
