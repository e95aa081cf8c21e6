//! # Keel Margin
//!
//! Leverage, liquidation and debt tracking for leveraged positions.
//!
//! This crate provides:
//!
//! - **Leverage**: Per-symbol settings checked against configured limits,
//!   with an append-only audit history
//! - **Liquidation**: Liquidation prices and margin health ratios
//! - **Lifecycle**: The `Open → Healthy ⇄ MarginCall → Liquidated` state machine
//! - **Debt**: A ledger of borrows, repayments and daily compounding interest
//! - **Summary**: Account totals and aggregate cross-margin health
//!
//! ## Example
//!
//! ```rust
//! use keel_core::PositionSide;
//! use keel_margin::liquidation_price;
//! use rust_decimal_macros::dec;
//!
//! let price = liquidation_price(PositionSide::Long, dec!(50000), dec!(10), dec!(0.005)).unwrap();
//! assert_eq!(price, dec!(45250));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod debt;
pub mod leverage;
pub mod liquidation;
pub mod monitor;
pub mod summary;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::debt::{DebtBalance, DebtEntry, DebtEntryKind, DebtLedger, RepaymentAllocation};
    pub use crate::leverage::{
        LeverageChange, LeverageInfo, LeverageManager, LeverageRequest, LeverageSetting,
    };
    pub use crate::liquidation::{
        health_at_liquidation, liquidation_price, maintenance_margin, margin_health_ratio,
        position_liquidation_price,
    };
    pub use crate::monitor::{MarginMonitor, MarginState, StateTransition};
    pub use crate::summary::DebtSummary;
}

pub use debt::{DebtEntry, DebtEntryKind, DebtLedger, RepaymentAllocation};
pub use leverage::{
    LeverageChange, LeverageInfo, LeverageManager, LeverageRequest, LeverageSetting,
};
pub use liquidation::{
    health_at_liquidation, liquidation_price, margin_health_ratio, position_liquidation_price,
};
pub use monitor::{MarginMonitor, MarginState};
pub use summary::DebtSummary;
