//! Margin, leverage and debt configuration.

use std::collections::BTreeMap;

use keel_core::{MarginType, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Validate, ValidationError};

// =============================================================================
// REPAYMENT POLICY
// =============================================================================

/// Order in which a repayment is applied to outstanding debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentPolicy {
    /// Reduce borrowed principal before accrued interest.
    PrincipalFirst,
    /// Settle accrued interest before principal.
    InterestFirst,
}

impl std::fmt::Display for RepaymentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrincipalFirst => write!(f, "principal_first"),
            Self::InterestFirst => write!(f, "interest_first"),
        }
    }
}

// =============================================================================
// SYMBOL LIMITS
// =============================================================================

/// Leverage limits for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLeverageLimit {
    /// Maximum leverage in cross-margin mode.
    pub cross: Decimal,
    /// Maximum leverage in isolated-margin mode.
    pub isolated: Decimal,
    /// Symbol-specific maintenance margin rate, overriding the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_margin_rate: Option<Decimal>,
}

impl SymbolLeverageLimit {
    /// Same maximum for both margin modes.
    #[must_use]
    pub fn uniform(max_leverage: Decimal) -> Self {
        Self {
            cross: max_leverage,
            isolated: max_leverage,
            maintenance_margin_rate: None,
        }
    }

    /// Sets the symbol-specific maintenance margin rate.
    #[must_use]
    pub fn with_maintenance_margin_rate(mut self, rate: Decimal) -> Self {
        self.maintenance_margin_rate = Some(rate);
        self
    }

    /// Limit for a margin mode.
    #[must_use]
    pub fn for_margin_type(&self, margin_type: MarginType) -> Decimal {
        match margin_type {
            MarginType::Cross => self.cross,
            MarginType::Isolated => self.isolated,
        }
    }
}

// =============================================================================
// MARGIN CONFIG
// =============================================================================

fn default_max_leverage() -> Decimal {
    Decimal::from(10)
}

fn default_maintenance_margin_rate() -> Decimal {
    Decimal::new(5, 3) // 0.5%
}

fn default_margin_call_threshold() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_liquidation_floor() -> Decimal {
    Decimal::ONE
}

fn default_daily_interest_rate() -> Decimal {
    Decimal::new(3, 4) // 0.03% per day
}

/// Margin engine configuration.
///
/// `repayment_policy` has no default: every configuration source must choose
/// one explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginConfig {
    /// Leverage ceiling for symbols without a specific limit.
    #[serde(default = "default_max_leverage")]
    pub default_max_leverage: Decimal,

    /// Per-symbol leverage limits.
    #[serde(default)]
    pub symbol_limits: BTreeMap<Symbol, SymbolLeverageLimit>,

    /// Maintenance margin as a fraction of notional.
    #[serde(default = "default_maintenance_margin_rate")]
    pub maintenance_margin_rate: Decimal,

    /// Health ratio below which a position enters margin call.
    #[serde(default = "default_margin_call_threshold")]
    pub margin_call_threshold: Decimal,

    /// Health ratio at or below which a position is liquidated.
    ///
    /// The health ratio at a position's liquidation price is
    /// `entry / liquidation price`, not 1, because maintenance there is
    /// measured on the current notional.
    #[serde(default = "default_liquidation_floor")]
    pub liquidation_floor: Decimal,

    /// Interest rate charged per day on borrowed capital.
    #[serde(default = "default_daily_interest_rate")]
    pub daily_interest_rate: Decimal,

    /// Allocation order for repayments.
    pub repayment_policy: RepaymentPolicy,
}

impl MarginConfig {
    /// Creates a configuration with default limits and the given policy.
    pub fn new(repayment_policy: RepaymentPolicy) -> Self {
        Self {
            default_max_leverage: default_max_leverage(),
            symbol_limits: BTreeMap::new(),
            maintenance_margin_rate: default_maintenance_margin_rate(),
            margin_call_threshold: default_margin_call_threshold(),
            liquidation_floor: default_liquidation_floor(),
            daily_interest_rate: default_daily_interest_rate(),
            repayment_policy,
        }
    }

    /// Standard configuration: 10x default ceiling, 0.5% maintenance margin,
    /// interest settled before principal.
    pub fn standard() -> Self {
        Self::new(RepaymentPolicy::InterestFirst)
    }

    /// Builder method to set the default leverage ceiling.
    pub fn with_default_max_leverage(mut self, max_leverage: Decimal) -> Self {
        self.default_max_leverage = max_leverage;
        self
    }

    /// Builder method to add a per-symbol limit.
    pub fn with_symbol_limit(mut self, symbol: impl Into<Symbol>, limit: SymbolLeverageLimit) -> Self {
        self.symbol_limits.insert(symbol.into(), limit);
        self
    }

    /// Builder method to set the maintenance margin rate.
    pub fn with_maintenance_margin_rate(mut self, rate: Decimal) -> Self {
        self.maintenance_margin_rate = rate;
        self
    }

    /// Builder method to set the margin-call threshold.
    pub fn with_margin_call_threshold(mut self, threshold: Decimal) -> Self {
        self.margin_call_threshold = threshold;
        self
    }

    /// Builder method to set the liquidation floor.
    pub fn with_liquidation_floor(mut self, floor: Decimal) -> Self {
        self.liquidation_floor = floor;
        self
    }

    /// Builder method to set the daily interest rate.
    pub fn with_daily_interest_rate(mut self, rate: Decimal) -> Self {
        self.daily_interest_rate = rate;
        self
    }

    /// Maximum leverage for a symbol in a margin mode.
    pub fn max_leverage(&self, symbol: &Symbol, margin_type: MarginType) -> Decimal {
        self.symbol_limits
            .get(symbol)
            .map_or(self.default_max_leverage, |l| l.for_margin_type(margin_type))
    }

    /// Maintenance margin rate for a symbol.
    pub fn maintenance_margin_rate_for(&self, symbol: &Symbol) -> Decimal {
        self.symbol_limits
            .get(symbol)
            .and_then(|l| l.maintenance_margin_rate)
            .unwrap_or(self.maintenance_margin_rate)
    }
}

fn check_leverage_vs_rate(
    errors: &mut Vec<ValidationError>,
    field: String,
    leverage: Decimal,
    rate: Decimal,
) {
    if leverage < Decimal::ONE {
        errors.push(ValidationError::with_rule(
            field,
            format!("leverage limit {leverage} must be at least 1"),
            "min_leverage",
        ));
    } else if rate * leverage >= Decimal::ONE {
        errors.push(ValidationError::with_rule(
            field,
            format!(
                "maintenance margin rate {rate} at {leverage}x leaves no room before liquidation"
            ),
            "rate_below_inverse_leverage",
        ));
    }
}

impl Validate for MarginConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.maintenance_margin_rate <= Decimal::ZERO
            || self.maintenance_margin_rate >= Decimal::ONE
        {
            errors.push(ValidationError::with_rule(
                "maintenance_margin_rate",
                "must lie strictly between 0 and 1",
                "unit_interval",
            ));
        }
        check_leverage_vs_rate(
            &mut errors,
            "default_max_leverage".to_string(),
            self.default_max_leverage,
            self.maintenance_margin_rate,
        );

        for (symbol, limit) in &self.symbol_limits {
            let rate = limit
                .maintenance_margin_rate
                .unwrap_or(self.maintenance_margin_rate);
            if rate <= Decimal::ZERO || rate >= Decimal::ONE {
                errors.push(ValidationError::with_rule(
                    format!("symbol_limits.{symbol}.maintenance_margin_rate"),
                    "must lie strictly between 0 and 1",
                    "unit_interval",
                ));
                continue;
            }
            check_leverage_vs_rate(
                &mut errors,
                format!("symbol_limits.{symbol}.cross"),
                limit.cross,
                rate,
            );
            check_leverage_vs_rate(
                &mut errors,
                format!("symbol_limits.{symbol}.isolated"),
                limit.isolated,
                rate,
            );
        }

        if self.liquidation_floor < Decimal::ZERO {
            errors.push(ValidationError::new(
                "liquidation_floor",
                "must not be negative",
            ));
        }
        if self.margin_call_threshold <= self.liquidation_floor {
            errors.push(ValidationError::with_rule(
                "margin_call_threshold",
                format!(
                    "threshold {} must exceed the liquidation floor {}",
                    self.margin_call_threshold, self.liquidation_floor
                ),
                "threshold_above_floor",
            ));
        }
        if self.daily_interest_rate < Decimal::ZERO || self.daily_interest_rate >= Decimal::ONE {
            errors.push(ValidationError::new(
                "daily_interest_rate",
                "must lie in [0, 1)",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_is_valid() {
        let config = MarginConfig::standard();
        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.repayment_policy, RepaymentPolicy::InterestFirst);
    }

    #[test]
    fn test_symbol_limits() {
        let config = MarginConfig::standard().with_symbol_limit(
            "BTC-USD",
            SymbolLeverageLimit {
                cross: dec!(20),
                isolated: dec!(50),
                maintenance_margin_rate: Some(dec!(0.004)),
            },
        );
        let btc = Symbol::new("BTC-USD");
        let eth = Symbol::new("ETH-USD");

        assert_eq!(config.max_leverage(&btc, MarginType::Cross), dec!(20));
        assert_eq!(config.max_leverage(&btc, MarginType::Isolated), dec!(50));
        assert_eq!(config.max_leverage(&eth, MarginType::Isolated), dec!(10));
        assert_eq!(config.maintenance_margin_rate_for(&btc), dec!(0.004));
        assert_eq!(config.maintenance_margin_rate_for(&eth), dec!(0.005));
        assert!(config.is_valid());
    }

    #[test]
    fn test_rate_must_leave_room_before_liquidation() {
        // 0.5% maintenance at 200x would put liquidation at entry
        let config = MarginConfig::standard().with_default_max_leverage(dec!(200));
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_deref(), Some("rate_below_inverse_leverage"));
    }

    #[test]
    fn test_threshold_above_floor() {
        let config = MarginConfig::standard()
            .with_margin_call_threshold(dec!(1.0))
            .with_liquidation_floor(dec!(1.0));
        assert!(!config.is_valid());
    }

    #[test]
    fn test_repayment_policy_is_required() {
        let json = r#"{ "default_max_leverage": 5 }"#;
        assert!(serde_json::from_str::<MarginConfig>(json).is_err());

        let json = r#"{ "repayment_policy": "principal_first" }"#;
        let config: MarginConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.repayment_policy, RepaymentPolicy::PrincipalFirst);
        assert_eq!(config.maintenance_margin_rate, dec!(0.005));
    }
}
