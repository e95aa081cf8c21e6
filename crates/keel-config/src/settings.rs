//! Aggregate risk settings and file loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analytics::{FreshnessConfig, OptimizerConfig, RebalanceConfig, VarConfig};
use crate::error::{ConfigError, ConfigResult, Validate, ValidationError};
use crate::margin::MarginConfig;

/// Every setting the analytics engine reads.
///
/// The `margin` section is required because its repayment policy has no
/// default; the other sections fall back to their defaults when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Margin, leverage and debt settings.
    pub margin: MarginConfig,
    /// VaR settings.
    #[serde(default)]
    pub var: VarConfig,
    /// Optimizer settings.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Rebalancer settings.
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    /// Snapshot freshness windows.
    #[serde(default)]
    pub freshness: FreshnessConfig,
}

impl RiskSettings {
    /// Creates settings around a margin configuration, defaulting the rest.
    pub fn new(margin: MarginConfig) -> Self {
        Self {
            margin,
            var: VarConfig::default(),
            optimizer: OptimizerConfig::default(),
            rebalance: RebalanceConfig::default(),
            freshness: FreshnessConfig::default(),
        }
    }

    /// Standard settings.
    pub fn standard() -> Self {
        Self::new(MarginConfig::standard())
    }

    /// Builder method to replace the VaR settings.
    #[must_use]
    pub fn with_var(mut self, var: VarConfig) -> Self {
        self.var = var;
        self
    }

    /// Builder method to replace the optimizer settings.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Builder method to replace the rebalancer settings.
    #[must_use]
    pub fn with_rebalance(mut self, rebalance: RebalanceConfig) -> Self {
        self.rebalance = rebalance;
        self
    }

    /// Builder method to replace the freshness windows.
    #[must_use]
    pub fn with_freshness(mut self, freshness: FreshnessConfig) -> Self {
        self.freshness = freshness;
        self
    }

    /// Parses and validates JSON settings.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate_or_error()?;
        Ok(settings)
    }

    /// Parses and validates TOML settings.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate_or_error()?;
        Ok(settings)
    }

    /// Loads settings from a `.json` or `.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        log::debug!("loading risk settings from {}", path.display());
        match extension.as_str() {
            "json" => Self::from_json_str(&text),
            "toml" => Self::from_toml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }
}

impl Validate for RiskSettings {
    fn validate(&self) -> Vec<ValidationError> {
        let sections: [(&str, Vec<ValidationError>); 5] = [
            ("margin", self.margin.validate()),
            ("var", self.var.validate()),
            ("optimizer", self.optimizer.validate()),
            ("rebalance", self.rebalance.validate()),
            ("freshness", self.freshness.validate()),
        ];
        sections
            .into_iter()
            .flat_map(|(name, errors)| errors.into_iter().map(move |e| e.nested(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::margin::RepaymentPolicy;
    use rust_decimal_macros::dec;

    const TOML: &str = r#"
[margin]
default_max_leverage = 20
maintenance_margin_rate = 0.004
repayment_policy = "principal_first"

[margin.symbol_limits.BTC-USD]
cross = 50
isolated = 100
maintenance_margin_rate = 0.002

[var]
min_historical_observations = 60

[optimizer]
max_weight = 0.5
"#;

    #[test]
    fn test_from_toml() {
        let settings = RiskSettings::from_toml_str(TOML).unwrap();
        assert_eq!(settings.margin.default_max_leverage, dec!(20));
        assert_eq!(settings.margin.repayment_policy, RepaymentPolicy::PrincipalFirst);
        assert_eq!(settings.margin.symbol_limits.len(), 1);
        assert_eq!(settings.var.min_historical_observations, 60);
        assert_eq!(settings.var.min_simulations, 1_000);
        assert!((settings.optimizer.max_weight - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_margin_section_is_rejected() {
        assert!(matches!(
            RiskSettings::from_toml_str("[var]\nmin_simulations = 10\n"),
            Err(ConfigError::Deserialization(_))
        ));
    }

    #[test]
    fn test_invalid_values_are_reported_with_section() {
        let json = r#"{
            "margin": { "repayment_policy": "interest_first", "maintenance_margin_rate": 1.5 },
            "var": { "min_simulations": 0 }
        }"#;
        let err = RiskSettings::from_json_str(json).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("margin.maintenance_margin_rate"), "{message}");
        assert!(message.contains("var.min_simulations"), "{message}");
    }

    #[test]
    fn test_json_round_trip() {
        let settings = RiskSettings::standard();
        let json = settings.to_json_string().unwrap();
        let parsed = RiskSettings::from_json_str(&json).unwrap();
        assert_eq!(parsed.margin, settings.margin);
        assert_eq!(parsed.var, settings.var);
    }
}
