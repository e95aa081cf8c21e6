//! Leverage settings and their audit history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use keel_config::MarginConfig;
use keel_core::{AnalyticsError, AnalyticsResult, MarginType, Position, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::liquidation::{liquidation_price, margin_health_ratio};

/// Leverage state of a symbol, with its risk figures when a position is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageInfo {
    /// Symbol.
    pub symbol: Symbol,
    /// Leverage multiplier in force.
    pub leverage: Decimal,
    /// Margin mode in force.
    pub margin_type: MarginType,
    /// Liquidation price at this leverage, if a position is open.
    pub liquidation_price: Option<Decimal>,
    /// Margin health ratio, if a position is open.
    pub margin_health_ratio: Option<Decimal>,
}

impl LeverageInfo {
    /// Figures for `position` re-levered at `leverage`.
    ///
    /// The position keeps its entry price; posted collateral becomes the
    /// initial margin at the new leverage.
    pub fn for_position(
        position: &Position,
        leverage: Decimal,
        margin_type: MarginType,
        maintenance_margin_rate: Decimal,
    ) -> AnalyticsResult<Self> {
        let liquidation = liquidation_price(
            position.side(),
            position.entry_price,
            leverage,
            maintenance_margin_rate,
        )?;
        let relevered = Position {
            leverage,
            margin_type,
            collateral: position.entry_notional() / leverage,
            ..position.clone()
        };
        Ok(Self {
            symbol: position.symbol.clone(),
            leverage,
            margin_type,
            liquidation_price: Some(liquidation),
            margin_health_ratio: margin_health_ratio(&relevered, maintenance_margin_rate),
        })
    }
}

/// One entry of the leverage audit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageChange {
    /// Symbol.
    pub symbol: Symbol,
    /// Leverage before the change, `None` for the first setting.
    pub previous_leverage: Option<Decimal>,
    /// Margin mode before the change.
    pub previous_margin_type: Option<MarginType>,
    /// Leverage after the change.
    pub new_leverage: Decimal,
    /// Margin mode after the change.
    pub new_margin_type: MarginType,
    /// Why the change was made.
    pub reason: String,
    /// When the change was made.
    pub timestamp: DateTime<Utc>,
}

/// A requested leverage change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageRequest {
    /// Symbol to re-lever.
    pub symbol: Symbol,
    /// Requested multiplier.
    pub leverage: Decimal,
    /// Requested margin mode.
    pub margin_type: MarginType,
    /// Why the change is made, kept in the history.
    #[serde(default)]
    pub reason: String,
}

impl LeverageRequest {
    /// Creates a request with an empty reason.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, leverage: Decimal, margin_type: MarginType) -> Self {
        Self {
            symbol: symbol.into(),
            leverage,
            margin_type,
            reason: String::new(),
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Current leverage setting of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageSetting {
    /// Leverage multiplier.
    pub leverage: Decimal,
    /// Margin mode.
    pub margin_type: MarginType,
}

/// Per-symbol leverage settings.
///
/// Requests above the configured maximum fail with `LeverageLimitExceeded`
/// and leave the previous setting in place. Accepted changes are appended to
/// the history, which is never rewritten.
#[derive(Debug, Clone, Default)]
pub struct LeverageManager {
    settings: BTreeMap<Symbol, LeverageSetting>,
    history: Vec<LeverageChange>,
}

impl LeverageManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and records a leverage change.
    ///
    /// When `position` is given, the returned info carries the liquidation
    /// price and health ratio at the new leverage; a leverage at which the
    /// maintenance rate leaves no room before liquidation is rejected.
    pub fn set_leverage(
        &mut self,
        request: LeverageRequest,
        position: Option<&Position>,
        config: &MarginConfig,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<LeverageInfo> {
        let LeverageRequest {
            symbol,
            leverage,
            margin_type,
            reason,
        } = request;

        if leverage < Decimal::ONE {
            return Err(AnalyticsError::invalid_parameter(
                "leverage",
                leverage,
                format!("{symbol}: leverage must be at least 1"),
            ));
        }
        let limit = config.max_leverage(&symbol, margin_type);
        if leverage > limit {
            log::debug!("rejected leverage {leverage}x for {symbol}: limit {limit}x");
            return Err(AnalyticsError::LeverageLimitExceeded {
                symbol,
                margin_type,
                requested: leverage,
                limit,
            });
        }

        let rate = config.maintenance_margin_rate_for(&symbol);
        let info = match position {
            Some(p) if p.symbol == symbol => {
                LeverageInfo::for_position(p, leverage, margin_type, rate)?
            }
            Some(p) => {
                return Err(AnalyticsError::invalid_parameter(
                    "position",
                    &p.symbol,
                    format!("position does not belong to {symbol}"),
                ));
            }
            None => LeverageInfo {
                symbol: symbol.clone(),
                leverage,
                margin_type,
                liquidation_price: None,
                margin_health_ratio: None,
            },
        };

        let previous = self.settings.insert(
            symbol.clone(),
            LeverageSetting {
                leverage,
                margin_type,
            },
        );
        log::debug!("{symbol} leverage set to {leverage}x ({margin_type})");
        self.history.push(LeverageChange {
            symbol,
            previous_leverage: previous.map(|s| s.leverage),
            previous_margin_type: previous.map(|s| s.margin_type),
            new_leverage: leverage,
            new_margin_type: margin_type,
            reason,
            timestamp: at,
        });

        Ok(info)
    }

    /// Current setting of a symbol.
    pub fn setting(&self, symbol: &Symbol) -> Option<LeverageSetting> {
        self.settings.get(symbol).copied()
    }

    /// All recorded changes, oldest first.
    pub fn history(&self) -> &[LeverageChange] {
        &self.history
    }

    /// Recorded changes of one symbol, oldest first.
    pub fn history_for<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> impl Iterator<Item = &'a LeverageChange> {
        self.history.iter().filter(move |c| c.symbol == *symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_config::SymbolLeverageLimit;
    use keel_core::ErrorKind;
    use rust_decimal_macros::dec;

    fn config() -> MarginConfig {
        MarginConfig::standard().with_symbol_limit(
            "ETH-USD",
            SymbolLeverageLimit {
                cross: dec!(20),
                isolated: dec!(10),
                maintenance_margin_rate: None,
            },
        )
    }

    #[test]
    fn test_limit_is_enforced_not_clamped() {
        let mut manager = LeverageManager::new();
        let eth = Symbol::new("ETH-USD");
        let now = Utc::now();

        let open = LeverageRequest::new("ETH-USD", dec!(5), MarginType::Isolated);
        manager.set_leverage(open, None, &config(), now).unwrap();
        let risk_on = LeverageRequest::new("ETH-USD", dec!(15), MarginType::Isolated);
        let err = manager.set_leverage(risk_on, None, &config(), now).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::LeverageLimitExceeded);
        match err {
            AnalyticsError::LeverageLimitExceeded {
                requested, limit, ..
            } => {
                assert_eq!(requested, dec!(15));
                assert_eq!(limit, dec!(10));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(manager.setting(&eth).unwrap().leverage, dec!(5));
        assert_eq!(manager.history().len(), 1);
    }

    #[test]
    fn test_margin_type_selects_limit() {
        let mut manager = LeverageManager::new();
        let cross = LeverageRequest::new("ETH-USD", dec!(15), MarginType::Cross);
        assert!(manager.set_leverage(cross, None, &config(), Utc::now()).is_ok());
    }

    #[test]
    fn test_history_records_previous_values() {
        let mut manager = LeverageManager::new();
        let btc = Symbol::new("BTC-USD");
        let now = Utc::now();
        let open = LeverageRequest::new("BTC-USD", dec!(2), MarginType::Cross).with_reason("open");
        let scale = LeverageRequest::new("BTC-USD", dec!(4), MarginType::Isolated)
            .with_reason("scale in");
        manager.set_leverage(open, None, &config(), now).unwrap();
        manager.set_leverage(scale, None, &config(), now).unwrap();

        let changes: Vec<_> = manager.history_for(&btc).collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].previous_leverage, None);
        assert_eq!(changes[1].previous_leverage, Some(dec!(2)));
        assert_eq!(changes[1].previous_margin_type, Some(MarginType::Cross));
        assert_eq!(changes[1].reason, "scale in");
    }

    #[test]
    fn test_info_for_open_position() {
        let mut manager = LeverageManager::new();
        let position = Position::builder("BTC-USD")
            .quantity(dec!(1))
            .entry_price(dec!(50000))
            .leverage(dec!(2))
            .build()
            .unwrap();

        let request = LeverageRequest::new("BTC-USD", dec!(10), MarginType::Cross);
        let info = manager
            .set_leverage(request, Some(&position), &config(), Utc::now())
            .unwrap();
        assert_eq!(info.liquidation_price, Some(dec!(45250)));
        assert_eq!(info.margin_health_ratio, Some(dec!(20)));
    }

    #[test]
    fn test_rejections_leave_no_history() {
        let mut manager = LeverageManager::new();
        let below_one = LeverageRequest::new("BTC-USD", dec!(0.5), MarginType::Cross);
        let err = manager
            .set_leverage(below_one, None, &config(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let eth = Position::builder("ETH-USD")
            .quantity(dec!(1))
            .entry_price(dec!(3000))
            .build()
            .unwrap();
        let mismatched = LeverageRequest::new("BTC-USD", dec!(3), MarginType::Cross);
        assert!(manager
            .set_leverage(mismatched, Some(&eth), &config(), Utc::now())
            .is_err());
        assert!(manager.history().is_empty());
        assert!(manager.setting(&Symbol::new("BTC-USD")).is_none());
    }
}
