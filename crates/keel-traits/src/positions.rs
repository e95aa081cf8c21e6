//! Position source.

use async_trait::async_trait;
use keel_core::Position;
use rust_decimal::Decimal;

use crate::error::SourceError;

/// Supplies snapshots of open positions.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// All open positions.
    async fn get_positions(&self) -> Result<Vec<Position>, SourceError>;

    /// Total portfolio value, including cash.
    async fn get_portfolio_value(&self) -> Result<Decimal, SourceError>;
}
