//! Multivariate groove baseline model

use crate::analysis::FeatureVector;
use ndarray::{Array1, Array2};

const DIMS: usize = FeatureVector::GROOVE_DIMS;

/// Pivots smaller than this mark the covariance matrix as singular
const PIVOT_EPSILON: f64 = 1e-9;

/// Running baseline statistics over the feature vector: column means, sample
/// covariance, and a cached inverse for Mahalanobis distance.
///
/// Fit once per song over the stable windows. A singular covariance (e.g. a
/// perfectly constant groove) marks the model invalid and every distance
/// reads 0 — groove distance is only one of several detection signals.
#[derive(Debug, Clone)]
pub struct GrooveModel {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
    inverse: Option<Array2<f64>>,
    pub sample_count: usize,
    pub is_valid: bool,
}

impl GrooveModel {
    /// Fit the model from stable-window feature coordinates.
    ///
    /// Needs at least `min_samples` rows and a few more rows than dimensions
    /// for the covariance to have a chance of full rank.
    pub fn fit(samples: &[[f64; DIMS]], min_samples: usize) -> Self {
        let n = samples.len();
        if n < min_samples.max(DIMS + 2) {
            return Self::invalid(n);
        }

        let mut mean = Array1::<f64>::zeros(DIMS);
        for row in samples {
            for (d, &v) in row.iter().enumerate() {
                mean[d] += v;
            }
        }
        mean /= n as f64;

        let mut covariance = Array2::<f64>::zeros((DIMS, DIMS));
        for row in samples {
            for i in 0..DIMS {
                let di = row[i] - mean[i];
                for j in i..DIMS {
                    let dj = row[j] - mean[j];
                    covariance[[i, j]] += di * dj;
                }
            }
        }
        covariance /= (n - 1) as f64;
        // Mirror the upper triangle; covariance is symmetric
        for i in 0..DIMS {
            for j in 0..i {
                covariance[[i, j]] = covariance[[j, i]];
            }
        }

        let inverse = invert(&covariance);
        let is_valid = inverse.is_some();
        if !is_valid {
            log::debug!("groove covariance singular after {} samples", n);
        }

        GrooveModel {
            mean,
            covariance,
            inverse,
            sample_count: n,
            is_valid,
        }
    }

    fn invalid(sample_count: usize) -> Self {
        GrooveModel {
            mean: Array1::zeros(DIMS),
            covariance: Array2::zeros((DIMS, DIMS)),
            inverse: None,
            sample_count,
            is_valid: false,
        }
    }

    /// Mahalanobis distance of a window's coordinates from the baseline.
    ///
    /// Returns 0.0 when the model is invalid (fail-open).
    pub fn distance(&self, coords: &[f64; DIMS]) -> f64 {
        let inverse = match &self.inverse {
            Some(m) => m,
            None => return 0.0,
        };
        let delta = Array1::from_iter(coords.iter().zip(self.mean.iter()).map(|(x, m)| x - m));
        let quadratic = delta.dot(&inverse.dot(&delta));
        quadratic.max(0.0).sqrt()
    }
}

/// Gauss-Jordan inversion with partial pivoting; `None` on a singular matrix
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    let mut a: Vec<Vec<f64>> = (0..n).map(|i| matrix.row(i).to_vec()).collect();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            out[[i, j]] = inv[i][j];
        }
    }
    Some(out)
}
