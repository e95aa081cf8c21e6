//! Optimization algorithms.
//!
//! This module provides the solvers behind mean-variance portfolio
//! construction: a convex quadratic program with linear equality constraints
//! and box bounds, and a derivative-free one-dimensional maximizer.

mod golden;
mod qp;

pub use golden::golden_section_max;
pub use qp::{solve_qp, QpProblem, QpSolution};

use serde::{Deserialize, Serialize};

/// Configuration for optimization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Multiplier on the average diagonal of the quadratic term, used as the
    /// ADMM penalty parameter.
    pub rho_scale: f64,
    /// Largest primal residual accepted when the iteration limit is reached.
    pub acceptable_residual: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 50_000,
            rho_scale: 1.0,
            acceptable_residual: 1e-6,
        }
    }
}

impl OptimizationConfig {
    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
