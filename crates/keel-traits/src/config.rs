//! Margin configuration source.

use async_trait::async_trait;
use keel_config::MarginConfig;

use crate::error::SourceError;

/// Supplies the margin configuration: leverage limits per symbol, maintenance
/// margin rate and margin-call threshold.
#[async_trait]
pub trait MarginConfigSource: Send + Sync {
    /// Current margin configuration.
    async fn get_margin_config(&self) -> Result<MarginConfig, SourceError>;
}
