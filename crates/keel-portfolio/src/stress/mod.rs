//! Stress testing for leveraged positions.
//!
//! This module provides:
//! - Scenario definitions (per-symbol and market-wide price shocks, volatility multiplier)
//! - A library of standard crypto and multi-asset scenarios
//! - P&L impact per symbol and aggregate, with multi-scenario summaries
//!
//! Scenarios are applied to copies of the position snapshots; nothing passed
//! in is mutated.

mod impact;
mod scenarios;

pub use impact::*;
pub use scenarios::*;
