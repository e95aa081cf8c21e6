//! Account-level debt and margin summary.

use chrono::{DateTime, Utc};
use keel_config::MarginConfig;
use keel_core::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::debt::DebtLedger;
use crate::liquidation::{health_ratio, maintenance_margin};

/// Aggregate debt and cross-margin health of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSummary {
    /// Outstanding borrowed principal.
    pub total_borrowed: Decimal,
    /// Posted collateral.
    pub total_collateral: Decimal,
    /// Interest accrued and not yet repaid.
    pub total_accrued_interest: Decimal,
    /// Collateral plus unrealized P&L less accrued interest.
    pub total_equity: Decimal,
    /// Maintenance margin required across positions.
    pub maintenance_margin: Decimal,
    /// Account equity over required maintenance margin, floored at zero.
    /// `None` when nothing is required.
    pub margin_health_ratio: Option<Decimal>,
    /// True when the health ratio is below the margin-call threshold.
    pub margin_call: bool,
    /// Number of positions included.
    pub position_count: usize,
    /// Time of the summary.
    pub as_of: DateTime<Utc>,
}

impl DebtSummary {
    /// Aggregates position snapshots and, when given, the debt ledger.
    ///
    /// Symbols tracked by the ledger take their borrowed amount and accrued
    /// interest from it instead of the snapshot; ledger debt with no open
    /// position still counts toward the totals.
    pub fn aggregate(
        positions: &[Position],
        ledger: Option<&DebtLedger>,
        config: &MarginConfig,
        as_of: DateTime<Utc>,
    ) -> Self {
        let mut total_borrowed = Decimal::ZERO;
        let mut total_collateral = Decimal::ZERO;
        let mut total_interest = Decimal::ZERO;
        let mut total_equity = Decimal::ZERO;
        let mut required = Decimal::ZERO;

        for position in positions {
            let (borrowed, interest) = ledger
                .and_then(|l| l.balance(&position.symbol))
                .map_or((position.borrowed, position.accrued_interest), |b| {
                    (b.principal, b.accrued_interest)
                });
            total_borrowed += borrowed;
            total_interest += interest;
            total_collateral += position.collateral;
            total_equity += position.collateral + position.unrealized_pnl() - interest;
            required += maintenance_margin(
                position,
                config.maintenance_margin_rate_for(&position.symbol),
            );
        }

        if let Some(ledger) = ledger {
            for (symbol, balance) in ledger.balances() {
                if positions.iter().all(|p| p.symbol != *symbol) {
                    total_borrowed += balance.principal;
                    total_interest += balance.accrued_interest;
                    total_equity -= balance.accrued_interest;
                }
            }
        }

        let margin_health_ratio = health_ratio(total_equity, required);
        let margin_call = margin_health_ratio.is_some_and(|r| r < config.margin_call_threshold);
        if margin_call {
            log::debug!(
                "account under margin call: equity {total_equity}, required {required}"
            );
        }

        Self {
            total_borrowed,
            total_collateral,
            total_accrued_interest: total_interest,
            total_equity,
            maintenance_margin: required,
            margin_health_ratio,
            margin_call,
            position_count: positions.len(),
            as_of,
        }
    }
}
