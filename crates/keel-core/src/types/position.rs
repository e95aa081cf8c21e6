//! Leveraged position snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Symbol;
use crate::error::{AnalyticsError, AnalyticsResult};

/// Margin mode of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MarginType {
    /// Collateral is shared across all positions in the account.
    #[default]
    Cross,
    /// Collateral is ring-fenced to this position.
    Isolated,
}

impl fmt::Display for MarginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginType::Cross => f.write_str("cross"),
            MarginType::Isolated => f.write_str("isolated"),
        }
    }
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    /// Positive quantity; loses when price falls.
    Long,
    /// Negative quantity; loses when price rises.
    Short,
}

/// A position snapshot supplied by the position repository.
///
/// Quantity is signed: positive for long, negative for short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol.
    pub symbol: Symbol,

    /// Signed quantity (units of the instrument).
    pub quantity: Decimal,

    /// Average entry price.
    pub entry_price: Decimal,

    /// Latest mark price.
    pub current_price: Decimal,

    /// Leverage multiplier (1 = unlevered).
    pub leverage: Decimal,

    /// Margin mode.
    pub margin_type: MarginType,

    /// Collateral posted against the position.
    pub collateral: Decimal,

    /// Borrowed capital financing the position.
    pub borrowed: Decimal,

    /// Interest accrued on the borrowed amount and not yet repaid.
    pub accrued_interest: Decimal,

    /// Time of the snapshot.
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Creates a new position builder.
    #[must_use]
    pub fn builder(symbol: impl Into<Symbol>) -> PositionBuilder {
        PositionBuilder::new(symbol)
    }

    /// Direction of the position.
    #[must_use]
    pub fn side(&self) -> PositionSide {
        if self.quantity >= Decimal::ZERO {
            PositionSide::Long
        } else {
            PositionSide::Short
        }
    }

    /// Absolute exposure at the current price.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quantity.abs() * self.current_price
    }

    /// Absolute exposure at the entry price.
    #[must_use]
    pub fn entry_notional(&self) -> Decimal {
        self.quantity.abs() * self.entry_price
    }

    /// Signed market value (negative for shorts).
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    /// Unrealized profit and loss at the current price.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.quantity * (self.current_price - self.entry_price)
    }

    /// Collateral plus unrealized P&L less accrued interest.
    #[must_use]
    pub fn equity(&self) -> Decimal {
        self.collateral + self.unrealized_pnl() - self.accrued_interest
    }

    /// Initial margin implied by the leverage at entry.
    #[must_use]
    pub fn initial_margin(&self) -> Decimal {
        self.entry_notional() / self.leverage
    }

    /// Copy of the position marked at a different price.
    #[must_use]
    pub fn marked_at(&self, price: Decimal) -> Self {
        Self {
            current_price: price,
            ..self.clone()
        }
    }
}

/// Builder for [`Position`].
#[derive(Debug, Clone)]
pub struct PositionBuilder {
    symbol: Symbol,
    quantity: Option<Decimal>,
    entry_price: Option<Decimal>,
    current_price: Option<Decimal>,
    leverage: Decimal,
    margin_type: MarginType,
    collateral: Option<Decimal>,
    borrowed: Option<Decimal>,
    accrued_interest: Decimal,
    updated_at: Option<DateTime<Utc>>,
}

impl PositionBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: None,
            entry_price: None,
            current_price: None,
            leverage: Decimal::ONE,
            margin_type: MarginType::default(),
            collateral: None,
            borrowed: None,
            accrued_interest: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Sets the signed quantity.
    #[must_use]
    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the entry price.
    #[must_use]
    pub fn entry_price(mut self, price: Decimal) -> Self {
        self.entry_price = Some(price);
        self
    }

    /// Sets the current mark price (defaults to the entry price).
    #[must_use]
    pub fn current_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Sets the leverage multiplier.
    #[must_use]
    pub fn leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    /// Sets the margin mode.
    #[must_use]
    pub fn margin_type(mut self, margin_type: MarginType) -> Self {
        self.margin_type = margin_type;
        self
    }

    /// Sets the posted collateral (defaults to the initial margin).
    #[must_use]
    pub fn collateral(mut self, collateral: Decimal) -> Self {
        self.collateral = Some(collateral);
        self
    }

    /// Sets the borrowed amount (defaults to entry notional less collateral).
    #[must_use]
    pub fn borrowed(mut self, borrowed: Decimal) -> Self {
        self.borrowed = Some(borrowed);
        self
    }

    /// Sets the accrued interest.
    #[must_use]
    pub fn accrued_interest(mut self, interest: Decimal) -> Self {
        self.accrued_interest = interest;
        self
    }

    /// Sets the snapshot timestamp (defaults to now).
    #[must_use]
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Builds the position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if a required field is missing or a value is
    /// out of its domain.
    pub fn build(self) -> AnalyticsResult<Position> {
        let symbol = self.symbol;
        let quantity = self.quantity.ok_or_else(|| {
            AnalyticsError::invalid_parameter("quantity", "none", format!("{symbol}: required"))
        })?;
        let entry_price = self.entry_price.ok_or_else(|| {
            AnalyticsError::invalid_parameter("entry_price", "none", format!("{symbol}: required"))
        })?;
        let current_price = self.current_price.unwrap_or(entry_price);

        if quantity.is_zero() {
            return Err(AnalyticsError::invalid_parameter(
                "quantity",
                quantity,
                format!("{symbol}: an open position cannot have zero quantity"),
            ));
        }
        if entry_price <= Decimal::ZERO || current_price <= Decimal::ZERO {
            return Err(AnalyticsError::invalid_parameter(
                "price",
                format!("entry={entry_price}, current={current_price}"),
                format!("{symbol}: prices must be positive"),
            ));
        }
        if self.leverage < Decimal::ONE {
            return Err(AnalyticsError::invalid_parameter(
                "leverage",
                self.leverage,
                format!("{symbol}: leverage must be at least 1"),
            ));
        }

        let entry_notional = quantity.abs() * entry_price;
        let collateral = self
            .collateral
            .unwrap_or_else(|| entry_notional / self.leverage);
        let borrowed = self
            .borrowed
            .unwrap_or_else(|| (entry_notional - collateral).max(Decimal::ZERO));

        for (name, value) in [
            ("collateral", collateral),
            ("borrowed", borrowed),
            ("accrued_interest", self.accrued_interest),
        ] {
            if value < Decimal::ZERO {
                return Err(AnalyticsError::invalid_parameter(
                    name,
                    value,
                    format!("{symbol}: must not be negative"),
                ));
            }
        }

        Ok(Position {
            symbol,
            quantity,
            entry_price,
            current_price,
            leverage: self.leverage,
            margin_type: self.margin_type,
            collateral,
            borrowed,
            accrued_interest: self.accrued_interest,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal_macros::dec;

    fn long_btc() -> Position {
        Position::builder("BTC-USD")
            .quantity(dec!(2))
            .entry_price(dec!(50000))
            .current_price(dec!(48000))
            .leverage(dec!(10))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_from_leverage() {
        let pos = long_btc();
        assert_eq!(pos.collateral, dec!(10000));
        assert_eq!(pos.borrowed, dec!(90000));
        assert_eq!(pos.initial_margin(), dec!(10000));
        assert_eq!(pos.margin_type, MarginType::Cross);
    }

    #[test]
    fn test_long_pnl_and_equity() {
        let pos = long_btc().clone();
        assert_eq!(pos.side(), PositionSide::Long);
        assert_eq!(pos.unrealized_pnl(), dec!(-4000));
        assert_eq!(pos.equity(), dec!(6000));
        assert_eq!(pos.notional(), dec!(96000));
        assert_eq!(pos.market_value(), dec!(96000));
    }

    #[test]
    fn test_short_pnl() {
        let pos = Position::builder("ETH-USD")
            .quantity(dec!(-10))
            .entry_price(dec!(3000))
            .current_price(dec!(2700))
            .leverage(dec!(3))
            .accrued_interest(dec!(50))
            .build()
            .unwrap();

        assert_eq!(pos.side(), PositionSide::Short);
        assert_eq!(pos.unrealized_pnl(), dec!(3000));
        assert_eq!(pos.market_value(), dec!(-27000));
        assert_eq!(pos.equity(), dec!(10000) + dec!(3000) - dec!(50));
    }

    #[test]
    fn test_marked_at_does_not_mutate() {
        let pos = long_btc();
        let shocked = pos.marked_at(dec!(40000));
        assert_eq!(pos.current_price, dec!(48000));
        assert_eq!(shocked.current_price, dec!(40000));
    }

    #[test]
    fn test_build_validation() {
        let missing = Position::builder("X").entry_price(dec!(1)).build();
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::InvalidParameter);

        let zero_qty = Position::builder("X")
            .quantity(Decimal::ZERO)
            .entry_price(dec!(1))
            .build();
        assert!(zero_qty.is_err());

        let low_leverage = Position::builder("X")
            .quantity(dec!(1))
            .entry_price(dec!(1))
            .leverage(dec!(0.5))
            .build();
        assert!(low_leverage.is_err());

        let negative_collateral = Position::builder("X")
            .quantity(dec!(1))
            .entry_price(dec!(1))
            .collateral(dec!(-1))
            .build();
        assert!(negative_collateral.is_err());
    }
}
