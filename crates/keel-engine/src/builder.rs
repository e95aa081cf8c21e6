//! Builder pattern for the risk engine.

use std::sync::Arc;

use async_trait::async_trait;
use keel_config::{ConfigStore, MarginConfig, RiskSettings};
use keel_traits::{MarginConfigSource, PositionSource, ReturnSeriesSource, SourceError};

use crate::engine::RiskEngine;
use crate::error::{EngineError, EngineResult};

/// Builder for constructing a [`RiskEngine`].
///
/// Return series and positions are required. Without a margin configuration
/// source the engine serves the `margin` section of its settings, following
/// every reload of the store.
pub struct RiskEngineBuilder {
    returns: Option<Arc<dyn ReturnSeriesSource>>,
    positions: Option<Arc<dyn PositionSource>>,
    margin: Option<Arc<dyn MarginConfigSource>>,
    settings: Option<RiskSettings>,
    store: Option<Arc<ConfigStore>>,
}

impl RiskEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            returns: None,
            positions: None,
            margin: None,
            settings: None,
            store: None,
        }
    }

    /// Set the return series source.
    pub fn with_returns(mut self, source: Arc<dyn ReturnSeriesSource>) -> Self {
        self.returns = Some(source);
        self
    }

    /// Set the position source.
    pub fn with_positions(mut self, source: Arc<dyn PositionSource>) -> Self {
        self.positions = Some(source);
        self
    }

    /// Set the margin configuration source.
    pub fn with_margin_config(mut self, source: Arc<dyn MarginConfigSource>) -> Self {
        self.margin = Some(source);
        self
    }

    /// Use one object for every collaborator.
    pub fn with_sources<S>(self, source: Arc<S>) -> Self
    where
        S: ReturnSeriesSource + PositionSource + MarginConfigSource + 'static,
    {
        self.with_returns(source.clone())
            .with_positions(source.clone())
            .with_margin_config(source)
    }

    /// Set the settings. Ignored when a store is supplied.
    pub fn with_settings(mut self, settings: RiskSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Share an existing settings store.
    pub fn with_config_store(mut self, store: Arc<ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the risk engine.
    pub fn build(self) -> EngineResult<RiskEngine> {
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(ConfigStore::new(
                self.settings.unwrap_or_else(RiskSettings::standard),
            )?),
        };

        let returns = self
            .returns
            .ok_or_else(|| EngineError::NotConfigured("returns source not configured".into()))?;

        let positions = self
            .positions
            .ok_or_else(|| EngineError::NotConfigured("positions source not configured".into()))?;

        let margin = self.margin.unwrap_or_else(|| {
            Arc::new(SettingsMarginConfig {
                store: Arc::clone(&store),
            })
        });

        RiskEngine::new(returns, positions, margin, store)
    }
}

impl Default for RiskEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves the margin section of the current settings snapshot.
struct SettingsMarginConfig {
    store: Arc<ConfigStore>,
}

#[async_trait]
impl MarginConfigSource for SettingsMarginConfig {
    async fn get_margin_config(&self) -> Result<MarginConfig, SourceError> {
        Ok(self.store.snapshot().margin.clone())
    }
}
