//! Domain types for risk and portfolio analytics.

mod frequency;
mod portfolio;
mod position;
mod returns;
mod symbol;
mod weights;

pub use frequency::SamplingFrequency;
pub use portfolio::Portfolio;
pub use position::{MarginType, Position, PositionBuilder, PositionSide};
pub use returns::ReturnSeries;
pub use symbol::Symbol;
pub use weights::Weights;
