//! Margin lifecycle of a leveraged position.
//!
//! ```text
//! Open → Healthy ⇄ MarginCall → Liquidated
//! Open → Closed,  Healthy → Closed
//! ```
//!
//! `Liquidated` and `Closed` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use keel_config::MarginConfig;
use keel_core::{AnalyticsError, AnalyticsResult, Position, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::liquidation::margin_health_ratio;

// =============================================================================
// STATES
// =============================================================================

/// Margin state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginState {
    /// Opened, not yet evaluated.
    Open,
    /// Health ratio at or above the margin-call threshold.
    Healthy,
    /// Health ratio below the margin-call threshold.
    MarginCall,
    /// Forced closure at or below the liquidation floor.
    Liquidated,
    /// Closed by the owner.
    Closed,
}

impl MarginState {
    /// Returns true for states with no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Liquidated | Self::Closed)
    }

    /// Returns true if `self → to` is a lifecycle edge.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::Healthy | Self::Closed)
                | (Self::Healthy, Self::MarginCall | Self::Closed)
                | (Self::MarginCall, Self::Healthy | Self::Liquidated)
        )
    }

    /// State implied by a health ratio. `None` (no requirement) is healthy.
    #[must_use]
    pub fn classify(health_ratio: Option<Decimal>, config: &MarginConfig) -> Self {
        match health_ratio {
            Some(r) if r <= config.liquidation_floor => Self::Liquidated,
            Some(r) if r < config.margin_call_threshold => Self::MarginCall,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for MarginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Healthy => "healthy",
            Self::MarginCall => "margin_call",
            Self::Liquidated => "liquidated",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State before.
    pub from: MarginState,
    /// State after.
    pub to: MarginState,
    /// Health ratio that triggered the change, if any.
    pub health_ratio: Option<Decimal>,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

// =============================================================================
// MONITOR
// =============================================================================

/// Tracks the margin state of one position.
#[derive(Debug, Clone)]
pub struct MarginMonitor {
    symbol: Symbol,
    state: MarginState,
    transitions: Vec<StateTransition>,
}

impl MarginMonitor {
    /// Starts monitoring a newly opened position.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            state: MarginState::Open,
            transitions: Vec::new(),
        }
    }

    /// Monitored symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Current state.
    pub fn state(&self) -> MarginState {
        self.state
    }

    /// Transitions so far, oldest first.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Moves to the state implied by `health_ratio`.
    ///
    /// Intermediate states are recorded, so a healthy position that drops
    /// straight through the floor passes `MarginCall` before `Liquidated`.
    /// Evaluating a terminal state fails with `InvalidTransition`.
    pub fn evaluate(
        &mut self,
        health_ratio: Option<Decimal>,
        config: &MarginConfig,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<MarginState> {
        let target = MarginState::classify(health_ratio, config);
        if self.state.is_terminal() {
            return Err(self.invalid(target));
        }

        while self.state != target {
            let next = match (self.state, target) {
                (MarginState::Open, _) => MarginState::Healthy,
                (MarginState::Healthy, _) => MarginState::MarginCall,
                (MarginState::MarginCall, t) => t,
                (from, _) => return Err(Self::invalid_from(from, target)),
            };
            self.apply(next, health_ratio, at);
        }
        Ok(self.state)
    }

    /// Evaluates the health of a position snapshot.
    pub fn evaluate_position(
        &mut self,
        position: &Position,
        config: &MarginConfig,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<MarginState> {
        if position.symbol != self.symbol {
            return Err(AnalyticsError::invalid_parameter(
                "position",
                &position.symbol,
                format!("monitor tracks {}", self.symbol),
            ));
        }
        let rate = config.maintenance_margin_rate_for(&position.symbol);
        self.evaluate(margin_health_ratio(position, rate), config, at)
    }

    /// Closes the position. Only `Open` and `Healthy` positions can close.
    pub fn close(&mut self, at: DateTime<Utc>) -> AnalyticsResult<()> {
        if !self.state.can_transition_to(MarginState::Closed) {
            return Err(self.invalid(MarginState::Closed));
        }
        self.apply(MarginState::Closed, None, at);
        Ok(())
    }

    fn apply(&mut self, to: MarginState, health_ratio: Option<Decimal>, at: DateTime<Utc>) {
        log::debug!("{}: {} -> {}", self.symbol, self.state, to);
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            health_ratio,
            at,
        });
        self.state = to;
    }

    fn invalid(&self, to: MarginState) -> AnalyticsError {
        Self::invalid_from(self.state, to)
    }

    fn invalid_from(from: MarginState, to: MarginState) -> AnalyticsError {
        AnalyticsError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_config::RepaymentPolicy;
    use keel_core::ErrorKind;
    use rust_decimal_macros::dec;

    fn config() -> MarginConfig {
        MarginConfig::new(RepaymentPolicy::PrincipalFirst)
    }

    #[test]
    fn test_healthy_margin_call_and_recovery() {
        let mut monitor = MarginMonitor::new("BTC-USD");
        let now = Utc::now();

        assert_eq!(
            monitor.evaluate(Some(dec!(3)), &config(), now).unwrap(),
            MarginState::Healthy
        );
        assert_eq!(
            monitor.evaluate(Some(dec!(1.2)), &config(), now).unwrap(),
            MarginState::MarginCall
        );
        assert_eq!(
            monitor.evaluate(Some(dec!(2)), &config(), now).unwrap(),
            MarginState::Healthy
        );
        assert_eq!(monitor.transitions().len(), 3);
    }

    #[test]
    fn test_floor_matched_to_liquidation_price() {
        use crate::liquidation::{health_at_liquidation, liquidation_price};
        use keel_core::PositionSide;

        let position = Position::builder("BTC-USD")
            .quantity(dec!(1))
            .entry_price(dec!(50000))
            .leverage(dec!(10))
            .build()
            .unwrap();
        let rate = config().maintenance_margin_rate;
        let liquidation = liquidation_price(PositionSide::Long, dec!(50000), dec!(10), rate).unwrap();
        let now = Utc::now();

        // Default floor: at the liquidation price a long is only in margin call
        let mut monitor = MarginMonitor::new("BTC-USD");
        let state = monitor
            .evaluate_position(&position.marked_at(liquidation), &config(), now)
            .unwrap();
        assert_eq!(state, MarginState::MarginCall);

        let floor = health_at_liquidation(PositionSide::Long, dec!(10), rate).unwrap();
        let matched = config().with_liquidation_floor(floor);
        let mut monitor = MarginMonitor::new("BTC-USD");
        let above = monitor
            .evaluate_position(&position.marked_at(liquidation + dec!(50)), &matched, now)
            .unwrap();
        assert_eq!(above, MarginState::MarginCall);
        let at = monitor
            .evaluate_position(&position.marked_at(liquidation), &matched, now)
            .unwrap();
        assert_eq!(at, MarginState::Liquidated);
    }

    #[test]
    fn test_crash_passes_through_margin_call() {
        let mut monitor = MarginMonitor::new("BTC-USD");
        let now = Utc::now();
        let state = monitor.evaluate(Some(dec!(0.4)), &config(), now).unwrap();
        assert_eq!(state, MarginState::Liquidated);

        let path: Vec<_> = monitor.transitions().iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![
                MarginState::Healthy,
                MarginState::MarginCall,
                MarginState::Liquidated
            ]
        );
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let now = Utc::now();
        let mut liquidated = MarginMonitor::new("ETH-USD");
        liquidated.evaluate(Some(Decimal::ZERO), &config(), now).unwrap();
        let err = liquidated.evaluate(Some(dec!(5)), &config(), now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(matches!(err, AnalyticsError::InvalidTransition { .. }));

        let mut closed = MarginMonitor::new("ETH-USD");
        closed.close(now).unwrap();
        assert_eq!(closed.state(), MarginState::Closed);
        assert!(closed.close(now).is_err());
    }

    #[test]
    fn test_cannot_close_under_margin_call() {
        let mut monitor = MarginMonitor::new("SOL-USD");
        let now = Utc::now();
        monitor.evaluate(Some(dec!(1.1)), &config(), now).unwrap();
        let err = monitor.close(now).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InvalidTransition {
                from: "margin_call".into(),
                to: "closed".into()
            }
        );
    }

    #[test]
    fn test_position_snapshot() {
        let position = Position::builder("BTC-USD")
            .quantity(dec!(1))
            .entry_price(dec!(50000))
            .current_price(dec!(45500))
            .leverage(dec!(10))
            .build()
            .unwrap();
        // Equity 500 against 227.5 maintenance: ratio ~2.2
        let mut monitor = MarginMonitor::new("BTC-USD");
        let state = monitor
            .evaluate_position(&position, &config(), Utc::now())
            .unwrap();
        assert_eq!(state, MarginState::Healthy);

        let lower = position.marked_at(dec!(45300));
        let state = monitor
            .evaluate_position(&lower, &config(), Utc::now())
            .unwrap();
        assert_eq!(state, MarginState::MarginCall);
    }
}
