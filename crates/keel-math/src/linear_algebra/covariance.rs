//! Covariance regularization.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};

/// Target matrix that a sample covariance is shrunk toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkageTarget {
    /// The sample variances with all covariances zeroed.
    ///
    /// Cannot rescue an asset with zero sample variance.
    #[default]
    Diagonal,
    /// Average sample variance times the identity.
    ScaledIdentity,
}

/// Eigenvalue summary of a validated covariance matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceDiagnostics {
    /// Smallest eigenvalue.
    pub min_eigenvalue: f64,
    /// Largest eigenvalue.
    pub max_eigenvalue: f64,
    /// Ratio of largest to smallest eigenvalue.
    pub condition_number: f64,
}

/// Linear shrinkage `(1 - intensity) * S + intensity * T`.
pub fn shrink_covariance(
    sample: &DMatrix<f64>,
    target: ShrinkageTarget,
    intensity: f64,
) -> MathResult<DMatrix<f64>> {
    let n = sample.nrows();
    if n == 0 || n != sample.ncols() {
        return Err(MathError::invalid_input("Covariance must be a non-empty square matrix"));
    }
    if !(0.0..=1.0).contains(&intensity) {
        return Err(MathError::invalid_input(format!(
            "Shrinkage intensity {intensity} outside [0, 1]"
        )));
    }

    let target_matrix = match target {
        ShrinkageTarget::Diagonal => DMatrix::from_diagonal(&sample.diagonal()),
        ShrinkageTarget::ScaledIdentity => {
            let avg = sample.trace() / n as f64;
            DMatrix::identity(n, n) * avg
        }
    };

    log::trace!("shrinking {n}x{n} covariance toward {target:?} with intensity {intensity}");
    Ok(sample * (1.0 - intensity) + target_matrix * intensity)
}

/// Checks a covariance matrix is symmetric positive definite and acceptably
/// conditioned.
pub fn validate_covariance(
    cov: &DMatrix<f64>,
    max_condition_number: f64,
) -> MathResult<CovarianceDiagnostics> {
    let n = cov.nrows();
    if n == 0 || n != cov.ncols() {
        return Err(MathError::invalid_input("Covariance must be a non-empty square matrix"));
    }
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("Covariance contains non-finite entries"));
    }
    let scale = cov.amax().max(f64::MIN_POSITIVE);
    for i in 0..n {
        for j in (i + 1)..n {
            if (cov[(i, j)] - cov[(j, i)]).abs() > 1e-12 * scale {
                return Err(MathError::invalid_input("Covariance is not symmetric"));
            }
        }
    }

    if cov.clone().cholesky().is_none() {
        return Err(MathError::singular(
            "covariance is not positive definite (zero-variance or collinear assets)",
        ));
    }

    let eigenvalues = cov.clone().symmetric_eigen().eigenvalues;
    let min_eigenvalue = eigenvalues.min();
    let max_eigenvalue = eigenvalues.max();
    if min_eigenvalue <= 0.0 {
        return Err(MathError::singular(format!(
            "smallest eigenvalue {min_eigenvalue:.3e} is not positive"
        )));
    }
    let condition_number = max_eigenvalue / min_eigenvalue;
    if condition_number > max_condition_number {
        return Err(MathError::singular(format!(
            "condition number {condition_number:.3e} exceeds {max_condition_number:.3e}"
        )));
    }

    Ok(CovarianceDiagnostics {
        min_eigenvalue,
        max_eigenvalue,
        condition_number,
    })
}
