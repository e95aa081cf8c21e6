//! Convex quadratic programming by ADMM.
//!
//! Solves
//!
//! ```text
//! minimize    ½ xᵀ P x + qᵀ x
//! subject to  A x = b
//!             l ≤ x ≤ u
//! ```
//!
//! by splitting the box constraint onto a copy `z` of `x`:
//!
//! ```text
//! x ← argmin ½ xᵀPx + qᵀx + ρ/2 ‖x − z + y/ρ‖²   s.t. Ax = b
//! z ← clip(x + y/ρ, l, u)
//! y ← y + ρ (x − z)
//! ```
//!
//! The x-update is the KKT system `[P + ρI, Aᵀ; A, 0]`, which does not
//! change between iterations and is factored once.
//!
//! ADMM converges slowly once the feasible set gets thin. Every few hundred
//! iterations the solver guesses the active bounds from `z`, solves the
//! equality-constrained problem on the free variables directly and stops if
//! the result satisfies the KKT conditions.

use nalgebra::{DMatrix, DVector};

use super::OptimizationConfig;
use crate::error::{MathError, MathResult};
use crate::linear_algebra::FactoredSystem;

/// Iterations between active-set polishing attempts.
const POLISH_INTERVAL: u32 = 200;

/// Distance (relative to the bound) within which `z` counts as on a bound.
const ACTIVE_TOLERANCE: f64 = 1e-7;

/// A convex quadratic program.
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    /// Symmetric positive semi-definite quadratic term `P`.
    pub quadratic: DMatrix<f64>,
    /// Linear term `q`.
    pub linear: DVector<f64>,
    /// Equality constraint rows `A`.
    pub equality_matrix: DMatrix<f64>,
    /// Equality constraint right-hand side `b`.
    pub equality_rhs: DVector<f64>,
    /// Lower bounds (may be `-inf`).
    pub lower: DVector<f64>,
    /// Upper bounds (may be `+inf`).
    pub upper: DVector<f64>,
}

impl QpProblem {
    /// Unconstrained problem `min ½ xᵀ P x`.
    pub fn new(quadratic: DMatrix<f64>) -> MathResult<Self> {
        let n = quadratic.nrows();
        if n == 0 || n != quadratic.ncols() {
            return Err(MathError::invalid_input("Quadratic term must be a non-empty square matrix"));
        }
        Ok(Self {
            quadratic,
            linear: DVector::zeros(n),
            equality_matrix: DMatrix::zeros(0, n),
            equality_rhs: DVector::zeros(0),
            lower: DVector::from_element(n, f64::NEG_INFINITY),
            upper: DVector::from_element(n, f64::INFINITY),
        })
    }

    /// Number of variables.
    pub fn dim(&self) -> usize {
        self.quadratic.nrows()
    }

    /// Sets the linear term.
    pub fn with_linear(mut self, linear: &[f64]) -> MathResult<Self> {
        self.check_len(linear.len())?;
        self.linear = DVector::from_column_slice(linear);
        Ok(self)
    }

    /// Appends the equality constraint `row · x = rhs`.
    pub fn with_equality(mut self, row: &[f64], rhs: f64) -> MathResult<Self> {
        self.check_len(row.len())?;
        let m = self.equality_matrix.nrows();
        let mut a = self.equality_matrix.clone().resize_vertically(m + 1, 0.0);
        for (j, v) in row.iter().enumerate() {
            a[(m, j)] = *v;
        }
        self.equality_matrix = a;
        self.equality_rhs = self.equality_rhs.clone().push(rhs);
        Ok(self)
    }

    /// Sets the same box bounds for every variable.
    pub fn with_uniform_bounds(self, lower: f64, upper: f64) -> MathResult<Self> {
        let n = self.dim();
        self.with_bounds(&vec![lower; n], &vec![upper; n])
    }

    /// Sets per-variable box bounds.
    pub fn with_bounds(mut self, lower: &[f64], upper: &[f64]) -> MathResult<Self> {
        self.check_len(lower.len())?;
        self.check_len(upper.len())?;
        if lower.iter().zip(upper).any(|(l, u)| l > u || l.is_nan() || u.is_nan()) {
            return Err(MathError::invalid_input("Lower bound exceeds upper bound"));
        }
        self.lower = DVector::from_column_slice(lower);
        self.upper = DVector::from_column_slice(upper);
        Ok(self)
    }

    /// Objective value at `x`.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.quadratic * x)) + self.linear.dot(x)
    }

    fn check_len(&self, len: usize) -> MathResult<()> {
        if len == self.dim() {
            Ok(())
        } else {
            Err(MathError::DimensionMismatch {
                rows1: self.dim(),
                cols1: 1,
                rows2: len,
                cols2: 1,
            })
        }
    }

    fn clip(&self, v: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            v.len(),
            v.iter()
                .enumerate()
                .map(|(i, x)| x.max(self.lower[i]).min(self.upper[i])),
        )
    }
}

/// Solution of a [`QpProblem`].
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    /// Optimal point (within the box bounds).
    pub x: DVector<f64>,
    /// Objective value at `x`.
    pub objective: f64,
    /// Iterations used.
    pub iterations: u32,
    /// Final `‖x − z‖∞`, the distance between the equality-feasible and
    /// box-feasible iterates.
    pub primal_residual: f64,
    /// Whether the tolerance was reached before the iteration limit.
    pub converged: bool,
}

/// Solves a convex QP with ADMM.
///
/// Fails with [`MathError::SingularMatrix`] when the KKT system cannot be
/// factored (linearly dependent equality rows) and with
/// [`MathError::ConvergenceFailed`] when the iteration limit is reached with a
/// residual above `config.acceptable_residual`.
pub fn solve_qp(problem: &QpProblem, config: &OptimizationConfig) -> MathResult<QpSolution> {
    let n = problem.dim();
    let m = problem.equality_matrix.nrows();

    if m > 0 {
        let gram = &problem.equality_matrix * problem.equality_matrix.transpose();
        let eigenvalues = gram.symmetric_eigen().eigenvalues;
        if eigenvalues.min() <= 1e-12 * eigenvalues.max().max(1.0) {
            return Err(MathError::singular(
                "equality constraints are linearly dependent",
            ));
        }
    }

    let avg_diag = problem.quadratic.trace() / n as f64;
    let rho = config.rho_scale * avg_diag.abs().max(1e-12);

    let mut kkt = DMatrix::zeros(n + m, n + m);
    kkt.view_mut((0, 0), (n, n)).copy_from(&problem.quadratic);
    for i in 0..n {
        kkt[(i, i)] += rho;
    }
    if m > 0 {
        kkt.view_mut((0, n), (n, m))
            .copy_from(&problem.equality_matrix.transpose());
        kkt.view_mut((n, 0), (m, n)).copy_from(&problem.equality_matrix);
    }
    let system = FactoredSystem::factor(kkt).map_err(|_| {
        MathError::singular("KKT system is singular (dependent equality constraints)")
    })?;

    let mut z = problem.clip(&DVector::from_element(n, 1.0 / n as f64));
    let mut y = DVector::<f64>::zeros(n);
    let mut rhs = DVector::<f64>::zeros(n + m);
    rhs.rows_mut(n, m).copy_from(&problem.equality_rhs);

    let mut primal_residual = f64::INFINITY;
    for iteration in 1..=config.max_iterations {
        let top = &z * rho - &y - &problem.linear;
        rhs.rows_mut(0, n).copy_from(&top);
        let sol = system.solve(&rhs)?;
        let x = sol.rows(0, n).into_owned();

        let z_prev = z;
        z = problem.clip(&(&x + &y / rho));
        let diff = &x - &z;
        y += &diff * rho;

        primal_residual = diff.amax();
        let dual_residual = (&z - &z_prev).amax();
        if primal_residual < config.tolerance && dual_residual < config.tolerance {
            log::trace!("ADMM converged in {iteration} iterations");
            return Ok(QpSolution {
                objective: problem.objective(&z),
                x: z,
                iterations: iteration,
                primal_residual,
                converged: true,
            });
        }

        if iteration % POLISH_INTERVAL == 0 {
            if let Some(x) = polish(problem, &z, config.tolerance) {
                log::trace!("ADMM polished after {iteration} iterations");
                return Ok(polished(problem, x, iteration));
            }
        }
    }

    if let Some(x) = polish(problem, &z, config.tolerance) {
        return Ok(polished(problem, x, config.max_iterations));
    }

    if primal_residual <= config.acceptable_residual {
        log::debug!(
            "ADMM hit {} iterations with residual {:.3e}; accepting",
            config.max_iterations,
            primal_residual
        );
        return Ok(QpSolution {
            objective: problem.objective(&z),
            x: z,
            iterations: config.max_iterations,
            primal_residual,
            converged: false,
        });
    }

    log::debug!("ADMM failed with residual {primal_residual:.3e}");
    Err(MathError::convergence_failed(config.max_iterations, primal_residual))
}

fn polished(problem: &QpProblem, x: DVector<f64>, iterations: u32) -> QpSolution {
    QpSolution {
        objective: problem.objective(&x),
        x,
        iterations,
        primal_residual: 0.0,
        converged: true,
    }
}

/// Solves the problem exactly on the active set suggested by `z`.
///
/// Returns `None` unless the result is primal feasible and every active
/// bound has a multiplier of the right sign, in which case it is optimal.
fn polish(problem: &QpProblem, z: &DVector<f64>, tolerance: f64) -> Option<DVector<f64>> {
    let n = problem.dim();
    let m = problem.equality_matrix.nrows();

    let mut x = z.clone();
    let mut at_lower = vec![false; n];
    let mut at_upper = vec![false; n];
    let mut free = Vec::with_capacity(n);
    for i in 0..n {
        let (l, u) = (problem.lower[i], problem.upper[i]);
        if l.is_finite() && z[i] <= l + ACTIVE_TOLERANCE * l.abs().max(1.0) {
            at_lower[i] = true;
            x[i] = l;
        } else if u.is_finite() && z[i] >= u - ACTIVE_TOLERANCE * u.abs().max(1.0) {
            at_upper[i] = true;
            x[i] = u;
        } else {
            free.push(i);
        }
    }
    let k = free.len();
    if k == 0 || k < m {
        return None;
    }

    let mut kkt = DMatrix::zeros(k + m, k + m);
    let mut rhs = DVector::zeros(k + m);
    for (r, &i) in free.iter().enumerate() {
        for (c, &j) in free.iter().enumerate() {
            kkt[(r, c)] = problem.quadratic[(i, j)];
        }
        for e in 0..m {
            kkt[(r, k + e)] = problem.equality_matrix[(e, i)];
            kkt[(k + e, r)] = problem.equality_matrix[(e, i)];
        }
        let fixed: f64 = (0..n)
            .filter(|&j| at_lower[j] || at_upper[j])
            .map(|j| problem.quadratic[(i, j)] * x[j])
            .sum();
        rhs[r] = -problem.linear[i] - fixed;
    }
    for e in 0..m {
        let fixed: f64 = (0..n)
            .filter(|&j| at_lower[j] || at_upper[j])
            .map(|j| problem.equality_matrix[(e, j)] * x[j])
            .sum();
        rhs[k + e] = problem.equality_rhs[e] - fixed;
    }

    let sol = FactoredSystem::factor(kkt).ok()?.solve(&rhs).ok()?;
    for (r, &i) in free.iter().enumerate() {
        let v = sol[r];
        if !v.is_finite() || v < problem.lower[i] - tolerance || v > problem.upper[i] + tolerance {
            return None;
        }
        x[i] = v.max(problem.lower[i]).min(problem.upper[i]);
    }

    let mut gradient = &problem.quadratic * &x + &problem.linear;
    if m > 0 {
        let feasibility = (&problem.equality_matrix * &x - &problem.equality_rhs).amax();
        if feasibility > tolerance.max(1e-12) * problem.equality_rhs.amax().max(1.0) {
            return None;
        }
        gradient += problem.equality_matrix.transpose() * sol.rows(k, m);
    }
    let scale = 1.0 + problem.quadratic.amax() + problem.linear.amax();
    let dual_tolerance = 1e-8 * scale;
    let dual_feasible = (0..n).all(|i| {
        if at_lower[i] {
            gradient[i] >= -dual_tolerance
        } else if at_upper[i] {
            gradient[i] <= dual_tolerance
        } else {
            true
        }
    });
    dual_feasible.then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_asset_cov() -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, &[0.04, 0.006, 0.006, 0.09])
    }

    #[test]
    fn test_unconstrained_quadratic() {
        // min ½xᵀIx - [2,3]ᵀx  =>  x = (2, 3)
        let problem = QpProblem::new(DMatrix::identity(2, 2))
            .unwrap()
            .with_linear(&[-2.0, -3.0])
            .unwrap();
        let sol = solve_qp(&problem, &OptimizationConfig::default()).unwrap();
        assert!(sol.converged);
        assert_relative_eq!(sol.x[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(sol.x[1], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_min_variance_two_assets_closed_form() {
        let cov = two_asset_cov();
        let problem = QpProblem::new(cov)
            .unwrap()
            .with_equality(&[1.0, 1.0], 1.0)
            .unwrap()
            .with_uniform_bounds(0.0, 1.0)
            .unwrap();
        let sol = solve_qp(&problem, &OptimizationConfig::default()).unwrap();

        // w1 = (s2² - s12) / (s1² + s2² - 2 s12)
        let expected = (0.09 - 0.006) / (0.04 + 0.09 - 0.012);
        assert_relative_eq!(sol.x[0], expected, epsilon = 1e-7);
        assert_relative_eq!(sol.x.sum(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_bounds_bind() {
        // Unconstrained optimum would put more than 0.6 in asset 0
        let problem = QpProblem::new(two_asset_cov())
            .unwrap()
            .with_equality(&[1.0, 1.0], 1.0)
            .unwrap()
            .with_uniform_bounds(0.0, 0.6)
            .unwrap();
        let sol = solve_qp(&problem, &OptimizationConfig::default()).unwrap();
        assert_relative_eq!(sol.x[0], 0.6, epsilon = 1e-7);
        assert_relative_eq!(sol.x[1], 0.4, epsilon = 1e-7);
    }

    #[test]
    fn test_target_return_constraint() {
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.01, 0.0, 0.01, 0.09, 0.02, 0.0, 0.02, 0.16],
        );
        let mu = [0.05, 0.10, 0.15];
        let problem = QpProblem::new(cov)
            .unwrap()
            .with_equality(&[1.0, 1.0, 1.0], 1.0)
            .unwrap()
            .with_equality(&mu, 0.11)
            .unwrap()
            .with_uniform_bounds(0.0, 1.0)
            .unwrap();
        let sol = solve_qp(&problem, &OptimizationConfig::default()).unwrap();

        let ret: f64 = sol.x.iter().zip(mu.iter()).map(|(w, m)| w * m).sum();
        assert_relative_eq!(ret, 0.11, epsilon = 1e-7);
        assert_relative_eq!(sol.x.sum(), 1.0, epsilon = 1e-7);
        assert!(sol.x.iter().all(|w| *w >= 0.0 && *w <= 1.0));
    }

    #[test]
    fn test_thin_feasible_set_is_polished() {
        // Target return just below the best asset: only a sliver of the
        // simplex is feasible and plain ADMM crawls.
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.01, 0.0, 0.01, 0.09, 0.02, 0.0, 0.02, 0.16],
        );
        let mu = [0.05, 0.10, 0.15];
        let problem = QpProblem::new(cov)
            .unwrap()
            .with_equality(&[1.0, 1.0, 1.0], 1.0)
            .unwrap()
            .with_equality(&mu, 0.1499)
            .unwrap()
            .with_uniform_bounds(0.0, 1.0)
            .unwrap();
        let sol = solve_qp(&problem, &OptimizationConfig::default()).unwrap();

        assert!(sol.converged);
        let ret: f64 = sol.x.iter().zip(mu.iter()).map(|(w, m)| w * m).sum();
        assert_relative_eq!(ret, 0.1499, epsilon = 1e-9);
        assert_relative_eq!(sol.x.sum(), 1.0, epsilon = 1e-9);
        assert!(sol.x.iter().all(|w| *w >= 0.0 && *w <= 1.0));
    }

    #[test]
    fn test_polish_rejects_wrong_active_set() {
        // Optimum is interior (2, 3); claiming x0 sits on its lower bound 0
        // gives a multiplier of the wrong sign.
        let problem = QpProblem::new(DMatrix::identity(2, 2))
            .unwrap()
            .with_linear(&[-2.0, -3.0])
            .unwrap()
            .with_bounds(&[0.0, 0.0], &[10.0, 10.0])
            .unwrap();
        let z = DVector::from_vec(vec![0.0, 2.9]);
        assert!(polish(&problem, &z, 1e-10).is_none());

        let z = DVector::from_vec(vec![1.9, 2.9]);
        let x = polish(&problem, &z, 1e-10).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dependent_equalities_are_singular() {
        let problem = QpProblem::new(two_asset_cov())
            .unwrap()
            .with_equality(&[1.0, 1.0], 1.0)
            .unwrap()
            .with_equality(&[2.0, 2.0], 2.0)
            .unwrap();
        assert!(matches!(
            solve_qp(&problem, &OptimizationConfig::default()),
            Err(MathError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_builder_validation() {
        assert!(QpProblem::new(DMatrix::zeros(0, 0)).is_err());
        let p = QpProblem::new(DMatrix::identity(2, 2)).unwrap();
        assert!(p.clone().with_linear(&[1.0]).is_err());
        assert!(p.with_bounds(&[1.0, 0.0], &[0.0, 1.0]).is_err());
    }
}
