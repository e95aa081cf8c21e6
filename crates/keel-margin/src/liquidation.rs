//! Liquidation prices and margin health.
//!
//! ## Formulas
//!
//! ```text
//! long  liquidation = entry × (1 − 1/L + mmr)
//! short liquidation = entry × (1 + 1/L − mmr)
//! health ratio      = max(0, equity) / (|qty| × price × mmr)
//! ```
//!
//! where `L` is the leverage multiplier and `mmr` the maintenance margin rate.
//!
//! ## Liquidation price and the health floor
//!
//! The liquidation price charges maintenance on the entry notional; the
//! health ratio charges it on the current notional. With collateral equal to
//! the initial margin, equity at the liquidation price is `|qty| × entry × mmr`,
//! so
//!
//! ```text
//! health ratio at liquidation = entry / liquidation
//! ```
//!
//! That is above 1 for a long and below 1 for a short. Under the default
//! `liquidation_floor` of 1 the margin monitor therefore liquidates a long
//! only after its price has passed the liquidation price, and a short before
//! its price gets there. [`health_at_liquidation`] is the floor at which both
//! agree for a given side and leverage.

use keel_core::{AnalyticsError, AnalyticsResult, Position, PositionSide};
use rust_decimal::Decimal;

/// Price at which a position's margin is exhausted.
///
/// Requires `leverage >= 1` and `0 <= maintenance_margin_rate < 1/leverage`,
/// which keeps the price strictly on the loss side of entry.
pub fn liquidation_price(
    side: PositionSide,
    entry_price: Decimal,
    leverage: Decimal,
    maintenance_margin_rate: Decimal,
) -> AnalyticsResult<Decimal> {
    if entry_price <= Decimal::ZERO {
        return Err(AnalyticsError::invalid_parameter(
            "entry_price",
            entry_price,
            "must be positive",
        ));
    }
    if leverage < Decimal::ONE {
        return Err(AnalyticsError::invalid_parameter(
            "leverage",
            leverage,
            "must be at least 1",
        ));
    }
    let inverse = Decimal::ONE / leverage;
    if maintenance_margin_rate.is_sign_negative() || maintenance_margin_rate >= inverse {
        return Err(AnalyticsError::invalid_parameter(
            "maintenance_margin_rate",
            maintenance_margin_rate,
            format!("must lie in [0, 1/leverage) = [0, {})", inverse.round_dp(6)),
        ));
    }

    let factor = match side {
        PositionSide::Long => Decimal::ONE - inverse + maintenance_margin_rate,
        PositionSide::Short => Decimal::ONE + inverse - maintenance_margin_rate,
    };
    Ok((entry_price * factor).round_dp(8))
}

/// Health ratio of a position, collateralized at its initial margin, whose
/// price sits exactly at its liquidation price.
///
/// Using this as `liquidation_floor` makes the margin monitor liquidate at
/// [`liquidation_price`].
pub fn health_at_liquidation(
    side: PositionSide,
    leverage: Decimal,
    maintenance_margin_rate: Decimal,
) -> AnalyticsResult<Decimal> {
    let factor = liquidation_price(side, Decimal::ONE, leverage, maintenance_margin_rate)?;
    Ok((Decimal::ONE / factor).round_dp(8))
}

/// Liquidation price of a position at its own leverage and entry price.
pub fn position_liquidation_price(
    position: &Position,
    maintenance_margin_rate: Decimal,
) -> AnalyticsResult<Decimal> {
    liquidation_price(
        position.side(),
        position.entry_price,
        position.leverage,
        maintenance_margin_rate,
    )
    .map_err(|e| match e {
        AnalyticsError::InvalidParameter {
            parameter,
            value,
            reason,
        } => AnalyticsError::InvalidParameter {
            parameter,
            value,
            reason: format!("{}: {reason}", position.symbol),
        },
        other => other,
    })
}

/// Maintenance margin required at the current price.
pub fn maintenance_margin(position: &Position, maintenance_margin_rate: Decimal) -> Decimal {
    position.notional() * maintenance_margin_rate
}

/// Equity over required maintenance margin, floored at zero.
///
/// `None` when nothing is required (zero rate or no exposure).
pub fn margin_health_ratio(position: &Position, maintenance_margin_rate: Decimal) -> Option<Decimal> {
    health_ratio(
        position.equity(),
        maintenance_margin(position, maintenance_margin_rate),
    )
}

pub(crate) fn health_ratio(equity: Decimal, required: Decimal) -> Option<Decimal> {
    if required <= Decimal::ZERO {
        return None;
    }
    Some((equity.max(Decimal::ZERO) / required).round_dp(8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::ErrorKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_ten_x() {
        let price = liquidation_price(PositionSide::Long, dec!(50000), dec!(10), dec!(0.005)).unwrap();
        assert_eq!(price, dec!(45250));
    }

    #[test]
    fn test_short_ten_x() {
        let price =
            liquidation_price(PositionSide::Short, dec!(50000), dec!(10), dec!(0.005)).unwrap();
        assert_eq!(price, dec!(54750));
    }

    #[test]
    fn test_closer_to_entry_with_more_leverage() {
        let at = |l| liquidation_price(PositionSide::Long, dec!(100), l, dec!(0.005)).unwrap();
        assert!(at(dec!(5)) > at(dec!(2)));
        assert!(at(dec!(20)) > at(dec!(5)));
        assert!(at(dec!(20)) < dec!(100));
    }

    #[test]
    fn test_rate_must_be_below_inverse_leverage() {
        let err =
            liquidation_price(PositionSide::Long, dec!(100), dec!(50), dec!(0.02)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err =
            liquidation_price(PositionSide::Short, dec!(100), dec!(0.5), dec!(0.005)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_health_ratio() {
        // 1 BTC at 50000, 10x: collateral 5000, maintenance 250 at entry
        let position = Position::builder("BTC-USD")
            .quantity(dec!(1))
            .entry_price(dec!(50000))
            .leverage(dec!(10))
            .build()
            .unwrap();
        assert_eq!(margin_health_ratio(&position, dec!(0.005)), Some(dec!(20)));

        // Price drop wipes out the equity: ratio floors at zero
        let crashed = position.marked_at(dec!(40000));
        assert_eq!(margin_health_ratio(&crashed, dec!(0.005)), Some(Decimal::ZERO));

        assert_eq!(margin_health_ratio(&position, Decimal::ZERO), None);
    }

    #[test]
    fn test_health_at_liquidation_is_entry_over_price() {
        let long = Position::builder("BTC-USD")
            .quantity(dec!(1))
            .entry_price(dec!(50000))
            .leverage(dec!(10))
            .build()
            .unwrap();
        let short = Position::builder("BTC-USD")
            .quantity(dec!(-1))
            .entry_price(dec!(50000))
            .leverage(dec!(10))
            .build()
            .unwrap();

        let long_at = long.marked_at(position_liquidation_price(&long, dec!(0.005)).unwrap());
        let expected = health_at_liquidation(PositionSide::Long, dec!(10), dec!(0.005)).unwrap();
        assert_eq!(margin_health_ratio(&long_at, dec!(0.005)), Some(expected));
        assert_eq!(expected, (dec!(50000) / dec!(45250)).round_dp(8));
        assert!(expected > Decimal::ONE);

        let short_at = short.marked_at(position_liquidation_price(&short, dec!(0.005)).unwrap());
        let expected = health_at_liquidation(PositionSide::Short, dec!(10), dec!(0.005)).unwrap();
        assert_eq!(margin_health_ratio(&short_at, dec!(0.005)), Some(expected));
        assert!(expected < Decimal::ONE);
    }

    #[test]
    fn test_position_error_names_symbol() {
        let position = Position::builder("DOGE-USD")
            .quantity(dec!(100))
            .entry_price(dec!(0.1))
            .leverage(dec!(100))
            .build()
            .unwrap();
        let err = position_liquidation_price(&position, dec!(0.02)).unwrap_err();
        assert!(err.to_string().contains("DOGE-USD"));
    }
}
