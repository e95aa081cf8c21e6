//! Long-lived settings snapshot with wholesale reload.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ConfigResult, Validate};
use crate::settings::RiskSettings;

/// Holds the current [`RiskSettings`] as an immutable snapshot.
///
/// Readers receive an `Arc` and keep using it for the whole request, so a
/// concurrent [`ConfigStore::reload`] never changes settings mid-computation.
/// A reload that fails validation leaves the current snapshot in place.
///
/// # Example
///
/// ```rust
/// use keel_config::{ConfigStore, RiskSettings};
///
/// let store = ConfigStore::new(RiskSettings::standard()).unwrap();
/// let before = store.snapshot();
///
/// let mut next = RiskSettings::standard();
/// next.var.min_historical_observations = 60;
/// store.reload(next).unwrap();
///
/// assert_eq!(before.var.min_historical_observations, 30);
/// assert_eq!(store.snapshot().var.min_historical_observations, 60);
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<RiskSettings>>,
}

impl ConfigStore {
    /// Creates a store after validating the initial settings.
    pub fn new(settings: RiskSettings) -> ConfigResult<Self> {
        settings.validate_or_error()?;
        Ok(Self {
            current: RwLock::new(Arc::new(settings)),
        })
    }

    /// Creates a store from a `.json` or `.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::new(RiskSettings::from_path(path)?)
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Arc<RiskSettings> {
        Arc::clone(&self.current.read())
    }

    /// Validates and swaps in new settings.
    pub fn reload(&self, settings: RiskSettings) -> ConfigResult<()> {
        settings.validate_or_error()?;
        *self.current.write() = Arc::new(settings);
        log::info!("risk settings reloaded");
        Ok(())
    }

    /// Reloads from a `.json` or `.toml` file.
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        self.reload(RiskSettings::from_path(path)?)
    }
}
