//! Golden-section search.

use crate::error::{MathError, MathResult};

const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Maximizes a unimodal function on `[a, b]`.
///
/// Returns the best abscissa found and its value. The objective is fallible
/// so that each evaluation can itself be an optimization.
///
/// # Example
///
/// ```rust
/// use keel_math::optimization::golden_section_max;
///
/// let (x, fx) = golden_section_max(|x| Ok(-(x - 0.3) * (x - 0.3)), 0.0, 1.0, 1e-9, 200).unwrap();
/// assert!((x - 0.3).abs() < 1e-6);
/// assert!(fx <= 0.0);
/// ```
pub fn golden_section_max<F>(
    mut f: F,
    a: f64,
    b: f64,
    tolerance: f64,
    max_iterations: u32,
) -> MathResult<(f64, f64)>
where
    F: FnMut(f64) -> MathResult<f64>,
{
    if !(a.is_finite() && b.is_finite()) || a > b {
        return Err(MathError::invalid_input(format!("Invalid interval [{a}, {b}]")));
    }

    let (mut lo, mut hi) = (a, b);
    let mut c = hi - INV_PHI * (hi - lo);
    let mut d = lo + INV_PHI * (hi - lo);
    let mut fc = f(c)?;
    let mut fd = f(d)?;

    let mut iterations = 0;
    while (hi - lo) > tolerance && iterations < max_iterations {
        if fc >= fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = f(c)?;
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INV_PHI * (hi - lo);
            fd = f(d)?;
        }
        iterations += 1;
    }

    Ok(if fc >= fd { (c, fc) } else { (d, fd) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_finds_interior_maximum() {
        let (x, fx) =
            golden_section_max(|x| Ok((x * std::f64::consts::PI).sin()), 0.0, 1.0, 1e-10, 500)
                .unwrap();
        assert_relative_eq!(x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(fx, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_monotone_goes_to_edge() {
        let (x, _) = golden_section_max(|x| Ok(x), 2.0, 3.0, 1e-9, 500).unwrap();
        assert_relative_eq!(x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_propagates_errors() {
        let result = golden_section_max(|_| Err(MathError::invalid_input("boom")), 0.0, 1.0, 1e-6, 10);
        assert!(result.is_err());
        assert!(golden_section_max(|x| Ok(x), 1.0, 0.0, 1e-6, 10).is_err());
    }
}
