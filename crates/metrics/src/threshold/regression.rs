//! Ordinary least squares on small dense designs.

use nalgebra::{DMatrix, DVector};

/// Ratio of smallest to largest singular value below which a design is
/// treated as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub(crate) struct LinearFit {
    pub coefficients: DVector<f64>,
    /// σ̂² (XᵀX)⁻¹ with σ̂² = RSS / (n − p).
    pub covariance: DMatrix<f64>,
    pub rss: f64,
    /// NaN when the outcome is constant.
    pub r2: f64,
}

impl LinearFit {
    pub fn coef(&self, i: usize) -> f64 {
        self.coefficients[i]
    }

    pub fn cov(&self, i: usize, j: usize) -> f64 {
        self.covariance[(i, j)]
    }
}

/// Design matrix with a leading intercept column.
pub(crate) fn design_with_intercept(columns: &[&[f64]]) -> DMatrix<f64> {
    let n = columns.first().map_or(0, |c| c.len());
    DMatrix::from_fn(n, columns.len() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            columns[j - 1][i]
        }
    })
}

/// Least-squares fit via SVD. Returns `None` for rank-deficient designs,
/// designs without residual degrees of freedom, and non-finite solutions.
pub(crate) fn least_squares(design: &DMatrix<f64>, y: &DVector<f64>) -> Option<LinearFit> {
    let (n, p) = design.shape();
    if n <= p || y.len() != n {
        return None;
    }

    let svd = design.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !max_sv.is_finite() || max_sv <= 0.0 || min_sv <= RANK_TOLERANCE * max_sv {
        return None;
    }

    let coefficients = svd.solve(y, 0.0).ok()?;
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let residuals = y - design * &coefficients;
    let rss = residuals.norm_squared();
    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r2 = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };

    let v_t = svd.v_t.as_ref()?;
    let inv_sq = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / (s * s)));
    let sigma2 = rss / (n - p) as f64;
    let covariance = v_t.transpose() * inv_sq * v_t * sigma2;

    Some(LinearFit {
        coefficients,
        covariance,
        rss,
        r2,
    })
}
