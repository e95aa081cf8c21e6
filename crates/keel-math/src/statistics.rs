//! Sample statistics over `f64` observations.

use nalgebra::DMatrix;

use crate::error::{MathError, MathResult};

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> MathResult<f64> {
    if data.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Unbiased sample variance (`n - 1` denominator).
pub fn variance(data: &[f64]) -> MathResult<f64> {
    if data.len() < 2 {
        return Err(MathError::insufficient_data(2, data.len()));
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Ok(ss / (data.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn std_dev(data: &[f64]) -> MathResult<f64> {
    Ok(variance(data)?.sqrt())
}

/// Lower empirical quantile of ascending-sorted data.
///
/// Returns the observation at index `floor(p * n)`, clamped to the last
/// element, together with that index. `p = 0.17` over six points selects the
/// second-smallest observation.
pub fn empirical_quantile(sorted: &[f64], p: f64) -> MathResult<(usize, f64)> {
    if sorted.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(MathError::invalid_input(format!(
            "quantile probability {p} outside [0, 1]"
        )));
    }
    let n = sorted.len();
    let index = ((p * n as f64).floor() as usize).min(n - 1);
    Ok((index, sorted[index]))
}

/// Sample covariance matrix of equally long series.
///
/// `series[i]` holds the observations of variable `i`.
pub fn covariance_matrix(series: &[&[f64]]) -> MathResult<DMatrix<f64>> {
    let k = series.len();
    if k == 0 {
        return Err(MathError::insufficient_data(1, 0));
    }
    let n = series[0].len();
    if let Some(bad) = series.iter().find(|s| s.len() != n) {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: 1,
            rows2: bad.len(),
            cols2: 1,
        });
    }
    if n < 2 {
        return Err(MathError::insufficient_data(2, n));
    }

    let means: Vec<f64> = series
        .iter()
        .map(|s| s.iter().sum::<f64>() / n as f64)
        .collect();

    let mut cov = DMatrix::zeros(k, k);
    for i in 0..k {
        for j in i..k {
            let c: f64 = series[i]
                .iter()
                .zip(series[j].iter())
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum::<f64>()
                / (n - 1) as f64;
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }
    Ok(cov)
}
