//! Stress scenario definitions.

use std::collections::BTreeMap;

use keel_core::{AnalyticsError, AnalyticsResult, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A named set of price shocks.
///
/// Shocks are percentages (`-30` is a 30% drop). The volatility multiplier
/// scales every shock, so the effective move of a symbol is
/// `shock% × volatility_multiplier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Scenario name, unique within one stress run.
    pub name: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Shock per symbol, in percent.
    #[serde(default)]
    pub price_shocks: BTreeMap<Symbol, Decimal>,

    /// Shock for held symbols without their own entry, in percent.
    #[serde(default)]
    pub market_shock: Option<Decimal>,

    /// Multiplier applied to every shock.
    #[serde(default = "default_multiplier")]
    pub volatility_multiplier: Decimal,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

impl StressScenario {
    /// Creates a scenario with no shocks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            price_shocks: BTreeMap::new(),
            market_shock: None,
            volatility_multiplier: Decimal::ONE,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Adds a shock for one symbol.
    #[must_use]
    pub fn with_shock(mut self, symbol: impl Into<Symbol>, shock_pct: Decimal) -> Self {
        self.price_shocks.insert(symbol.into(), shock_pct);
        self
    }

    /// Sets the market-wide shock.
    #[must_use]
    pub fn with_market_shock(mut self, shock_pct: Decimal) -> Self {
        self.market_shock = Some(shock_pct);
        self
    }

    /// Sets the volatility multiplier.
    #[must_use]
    pub fn with_volatility_multiplier(mut self, multiplier: Decimal) -> Self {
        self.volatility_multiplier = multiplier;
        self
    }

    /// Effective fractional price move for `symbol`, or `None` if the scenario
    /// does not touch it.
    pub fn effective_shock(&self, symbol: &Symbol) -> Option<Decimal> {
        self.price_shocks
            .get(symbol)
            .copied()
            .or(self.market_shock)
            .map(|pct| pct / Decimal::ONE_HUNDRED * self.volatility_multiplier)
    }

    /// Checks the name, multiplier and that no price is driven below zero.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.name.trim().is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "name",
                "\"\"",
                "scenario name must not be empty",
            ));
        }
        if self.volatility_multiplier.is_sign_negative() {
            return Err(AnalyticsError::invalid_parameter(
                "volatility_multiplier",
                self.volatility_multiplier,
                format!("scenario '{}' has a negative multiplier", self.name),
            ));
        }
        let floor = -Decimal::ONE_HUNDRED;
        for pct in self.price_shocks.values().chain(self.market_shock.iter()) {
            if *pct * self.volatility_multiplier < floor {
                return Err(AnalyticsError::invalid_parameter(
                    "price_shock",
                    pct,
                    format!("scenario '{}' drives a price below zero", self.name),
                ));
            }
        }
        Ok(())
    }
}

/// Standard stress scenarios for leveraged crypto and multi-asset books.
pub mod standard {
    use super::*;
    use rust_decimal_macros::dec;

    /// Broad market crash: everything -30%.
    #[must_use]
    pub fn market_crash() -> StressScenario {
        StressScenario::new("Market Crash")
            .with_description("All holdings fall 30%")
            .with_market_shock(dec!(-30))
    }

    /// Flash crash: -10% at doubled volatility.
    #[must_use]
    pub fn flash_crash() -> StressScenario {
        StressScenario::new("Flash Crash")
            .with_description("Intraday liquidation cascade: -10% at 2x volatility")
            .with_market_shock(dec!(-10))
            .with_volatility_multiplier(dec!(2))
    }

    /// Volatility spike: modest drift down, tripled volatility.
    #[must_use]
    pub fn volatility_spike() -> StressScenario {
        StressScenario::new("Volatility Spike")
            .with_description("Risk-off drift of -5% at 3x volatility")
            .with_market_shock(dec!(-5))
            .with_volatility_multiplier(dec!(3))
    }

    /// Short squeeze: everything +25%.
    #[must_use]
    pub fn short_squeeze() -> StressScenario {
        StressScenario::new("Short Squeeze")
            .with_description("All holdings rally 25%")
            .with_market_shock(dec!(25))
    }

    /// Crypto winter: a 60% drawdown.
    #[must_use]
    pub fn crypto_winter() -> StressScenario {
        StressScenario::new("Crypto Winter")
            .with_description("Prolonged bear market: -60%")
            .with_market_shock(dec!(-60))
    }

    /// Returns all standard scenarios.
    #[must_use]
    pub fn all() -> Vec<StressScenario> {
        vec![
            market_crash(),
            flash_crash(),
            volatility_spike(),
            short_squeeze(),
            crypto_winter(),
        ]
    }
}
