//! Linear algebra utilities.
//!
//! This module provides the matrix operations the optimizer needs: a linear
//! system factored once and solved many times, and covariance regularization
//! with a usability check.

mod covariance;

pub use covariance::{shrink_covariance, validate_covariance, CovarianceDiagnostics, ShrinkageTarget};

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector, Dyn, LU};

/// A square linear system `A x = b` with `A` factored by partial-pivot LU.
///
/// Factoring is the expensive step; [`FactoredSystem::solve`] can then be
/// called once per right-hand side.
#[derive(Debug, Clone)]
pub struct FactoredSystem {
    lu: LU<f64, Dyn, Dyn>,
    dim: usize,
}

impl FactoredSystem {
    /// Factors a square matrix.
    pub fn factor(matrix: DMatrix<f64>) -> MathResult<Self> {
        let dim = matrix.nrows();
        if dim != matrix.ncols() {
            return Err(MathError::invalid_input("Matrix must be square"));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(MathError::invalid_input("Matrix contains non-finite entries"));
        }
        let lu = matrix.lu();
        if !lu.is_invertible() {
            return Err(MathError::singular("LU factorization found a zero pivot"));
        }
        let pivots = lu.u().diagonal();
        if pivots.amin() <= pivots.amax() * 1e-14 {
            return Err(MathError::singular("LU factorization found a negligible pivot"));
        }
        Ok(Self { lu, dim })
    }

    /// Dimension of the system.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Solves for one right-hand side.
    pub fn solve(&self, rhs: &DVector<f64>) -> MathResult<DVector<f64>> {
        if rhs.len() != self.dim {
            return Err(MathError::DimensionMismatch {
                rows1: self.dim,
                cols1: self.dim,
                rows2: rhs.len(),
                cols2: 1,
            });
        }
        self.lu
            .solve(rhs)
            .ok_or_else(|| MathError::singular("LU back-substitution failed"))
    }
}

/// Solves a linear system `A x = b`.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    FactoredSystem::factor(a.clone())?.solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_linear_system() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![5.0, 5.0]);

        let x = solve_linear_system(&a, &b).unwrap();

        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_leading_pivot_needs_pivoting() {
        // KKT-style system with a zero block on the diagonal
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 1.0, 1.0, 2.0, 0.0, 1.0, 0.0, 2.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 2.0]);
        let x = solve_linear_system(&a, &b).unwrap();
        let residual = &a * &x - &b;
        assert!(residual.amax() < 1e-10);
    }

    #[test]
    fn test_factored_system_reuse() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let system = FactoredSystem::factor(a.clone()).unwrap();
        for rhs in [[1.0, 0.0], [0.0, 1.0], [3.0, -2.0]] {
            let b = DVector::from_row_slice(&rhs);
            let x = system.solve(&b).unwrap();
            assert!((&a * &x - &b).amax() < 1e-12);
        }
        assert!(system.solve(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn test_singular_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(
            FactoredSystem::factor(a),
            Err(MathError::SingularMatrix { .. })
        ));
    }
}
