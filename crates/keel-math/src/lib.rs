//! # Keel Math
//!
//! Numerical building blocks for the Keel risk and portfolio analytics engine.
//!
//! This crate provides:
//!
//! - **Statistics**: Sample moments, empirical percentiles, covariance matrices
//! - **Distributions**: Standard normal quantile and density
//! - **Linear Algebra**: Factored linear systems, covariance shrinkage and validation
//! - **Optimization**: Box- and equality-constrained quadratic programming (ADMM),
//!   golden-section search
//!
//! ## Design Philosophy
//!
//! - **f64 Statistics**: Estimation runs in binary floating point; money does not
//! - **Fail Loudly**: Singular or unusable matrices are errors, never defaults
//! - **Deterministic**: No hidden randomness or global state

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]

pub mod distributions;
pub mod error;
pub mod linear_algebra;
pub mod optimization;
pub mod statistics;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::distributions::{normal_cdf, normal_pdf, normal_quantile};
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{
        shrink_covariance, validate_covariance, CovarianceDiagnostics, FactoredSystem,
        ShrinkageTarget,
    };
    pub use crate::optimization::{
        golden_section_max, solve_qp, OptimizationConfig, QpProblem, QpSolution,
    };
    pub use crate::statistics::{covariance_matrix, empirical_quantile, mean, std_dev, variance};
}

pub use error::{MathError, MathResult};
