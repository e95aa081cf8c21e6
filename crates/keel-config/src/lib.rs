//! Keel Configuration Layer
//!
//! This crate provides the configuration value objects read by the Keel risk
//! engine. Settings are passed explicitly into each computation or held in a
//! [`ConfigStore`] as an immutable snapshot that is replaced wholesale on reload.
//!
//! # Features
//!
//! - **Margin Configuration**: Leverage ceilings per symbol and margin mode,
//!   maintenance margin, margin-call threshold, interest and repayment policy
//! - **VaR Configuration**: Observation and simulation minimums, batch sizes
//! - **Optimizer Configuration**: Weight bounds, covariance shrinkage, solver settings
//! - **Freshness Windows**: Maximum snapshot ages for collaborator data
//! - **Validation**: Every section implements [`Validate`]
//!
//! # Example
//!
//! ```rust
//! use keel_config::{MarginConfig, RepaymentPolicy, SymbolLeverageLimit, Validate};
//! use keel_core::{MarginType, Symbol};
//! use rust_decimal_macros::dec;
//!
//! let config = MarginConfig::new(RepaymentPolicy::PrincipalFirst)
//!     .with_symbol_limit("BTC-USD", SymbolLeverageLimit::uniform(dec!(25)));
//!
//! assert!(config.is_valid());
//! assert_eq!(config.max_leverage(&Symbol::new("BTC-USD"), MarginType::Cross), dec!(25));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod analytics;
pub mod error;
pub mod margin;
pub mod settings;
pub mod store;

pub use analytics::{FreshnessConfig, OptimizerConfig, RebalanceConfig, VarConfig};
pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
pub use margin::{MarginConfig, RepaymentPolicy, SymbolLeverageLimit};
pub use settings::RiskSettings;
pub use store::ConfigStore;
