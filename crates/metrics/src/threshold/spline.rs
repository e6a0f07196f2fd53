//! Cubic smoothing spline (Reinsch form) and a maximum-curvature estimate.
//!
//! For sorted distinct knots t₁..tₙ with weights w, the fitted values g and
//! interior second derivatives γ solve
//! (R + λ·QᵀW⁻¹Q)γ = Qᵀy and g = y − λ·W⁻¹Qγ,
//! where Q (n × n−2) and R (n−2 × n−2) are the usual tridiagonal band
//! matrices built from the knot spacings.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use thiserror::Error;

use crate::config::ThresholdConfig;

/// Distinct predictor values needed for a spline fit.
pub const MIN_DISTINCT: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineFailure {
    #[error("need at least 4 distinct predictor values, got {0}")]
    TooFewDistinct(usize),
    #[error("non-finite predictor or outcome value")]
    NonFinite,
    #[error("smoothing system is singular")]
    Singular,
    #[error("curvature grid needs at least 3 points, got {0}")]
    GridTooSmall(usize),
}

/// A fitted natural cubic smoothing spline.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    fitted: Vec<f64>,
    /// Second derivative at each knot; zero at both ends.
    second: Vec<f64>,
    pub lambda: f64,
}

/// Collapse tied predictor values: mean outcome, weight = count.
fn collapse_ties(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut knots: Vec<f64> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();
    let mut weights: Vec<f64> = Vec::new();
    for (xv, yv) in pairs {
        match knots.last() {
            Some(&last) if last == xv => {
                if let (Some(s), Some(w)) = (sums.last_mut(), weights.last_mut()) {
                    *s += yv;
                    *w += 1.0;
                }
            }
            _ => {
                knots.push(xv);
                sums.push(yv);
                weights.push(1.0);
            }
        }
    }
    let means = sums.iter().zip(&weights).map(|(s, w)| s / w).collect();
    (knots, means, weights)
}

impl SmoothingSpline {
    /// Fit with smoothness `spar`, mapped to λ = r·256^(3·spar − 1) where
    /// r = Σw / tr(QR⁻¹Qᵀ) puts λ on the scale of the data.
    pub fn fit(x: &[f64], y: &[f64], spar: f64) -> Result<Self, SplineFailure> {
        let n_rows = x.len().min(y.len());
        let (x, y) = (&x[..n_rows], &y[..n_rows]);
        if x.iter().chain(y).any(|v| !v.is_finite()) || !spar.is_finite() {
            return Err(SplineFailure::NonFinite);
        }

        let (knots, ybar, weights) = collapse_ties(x, y);
        let n = knots.len();
        if n < MIN_DISTINCT {
            return Err(SplineFailure::TooFewDistinct(n));
        }

        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let m = n - 2;
        let mut q = DMatrix::<f64>::zeros(n, m);
        let mut r = DMatrix::<f64>::zeros(m, m);
        for j in 0..m {
            // column j corresponds to interior knot j + 1
            q[(j, j)] = 1.0 / h[j];
            q[(j + 1, j)] = -1.0 / h[j] - 1.0 / h[j + 1];
            q[(j + 2, j)] = 1.0 / h[j + 1];
            r[(j, j)] = (h[j] + h[j + 1]) / 3.0;
            if j + 1 < m {
                r[(j, j + 1)] = h[j + 1] / 6.0;
                r[(j + 1, j)] = h[j + 1] / 6.0;
            }
        }

        let r_inv = r.clone().try_inverse().ok_or(SplineFailure::Singular)?;
        let penalty_trace = (&q * &r_inv * q.transpose()).trace();
        let total_weight: f64 = weights.iter().sum();
        if !penalty_trace.is_finite() || penalty_trace <= 0.0 {
            return Err(SplineFailure::Singular);
        }
        let lambda = total_weight / penalty_trace * 256f64.powf(3.0 * spar - 1.0);

        let w_inv = DMatrix::from_diagonal(&DVector::from_iterator(
            n,
            weights.iter().map(|w| 1.0 / w),
        ));
        let yv = DVector::from_vec(ybar);
        let system = &r + lambda * q.transpose() * &w_inv * &q;
        let rhs = q.transpose() * &yv;
        let gamma = system
            .cholesky()
            .ok_or(SplineFailure::Singular)?
            .solve(&rhs);
        let fitted = &yv - lambda * &w_inv * &q * &gamma;

        let mut second = vec![0.0; n];
        second[1..n - 1].copy_from_slice(gamma.as_slice());

        Ok(Self {
            knots,
            fitted: fitted.iter().copied().collect(),
            second,
            lambda,
        })
    }

    /// Evaluate the natural cubic spline; linear beyond the end knots.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.knots.len();
        let (first, last) = (self.knots[0], self.knots[n - 1]);
        if t <= first {
            let slope = (self.fitted[1] - self.fitted[0]) / (self.knots[1] - first)
                - (self.knots[1] - first) * self.second[1] / 6.0;
            return self.fitted[0] + (t - first) * slope;
        }
        if t >= last {
            let h = last - self.knots[n - 2];
            let slope = (self.fitted[n - 1] - self.fitted[n - 2]) / h + h * self.second[n - 2] / 6.0;
            return self.fitted[n - 1] + (t - last) * slope;
        }

        let i = self.knots.partition_point(|&k| k <= t).saturating_sub(1).min(n - 2);
        let (tl, tr) = (self.knots[i], self.knots[i + 1]);
        let h = tr - tl;
        let (a, b) = (t - tl, tr - t);
        (a * self.fitted[i + 1] + b * self.fitted[i]) / h
            - a * b / 6.0 * ((1.0 + a / h) * self.second[i + 1] + (1.0 + b / h) * self.second[i])
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }
}

/// Result of the maximum-curvature estimator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvaturePoint {
    pub threshold: f64,
    /// |second difference| at the chosen grid point.
    pub curvature: f64,
    pub lambda: f64,
}

/// Smooth (x, y), take second differences on an even grid over the x-range
/// and return the grid point where their magnitude peaks (first on ties).
pub fn max_curvature(
    x: &[f64],
    y: &[f64],
    config: &ThresholdConfig,
) -> Result<CurvaturePoint, SplineFailure> {
    let grid_points = config.curvature_grid_points;
    if grid_points < 3 {
        return Err(SplineFailure::GridTooSmall(grid_points));
    }
    let spline = SmoothingSpline::fit(x, y, config.spline_spar)?;
    let knots = spline.knots();
    let (lo, hi) = (knots[0], knots[knots.len() - 1]);
    let step = (hi - lo) / (grid_points - 1) as f64;

    let grid: Vec<f64> = (0..grid_points).map(|i| lo + step * i as f64).collect();
    let values: Vec<f64> = grid.iter().map(|&t| spline.evaluate(t)).collect();

    let mut best = (1, f64::NEG_INFINITY);
    for k in 1..grid_points - 1 {
        let d2 = (values[k - 1] - 2.0 * values[k] + values[k + 1]).abs();
        if d2 > best.1 {
            best = (k, d2);
        }
    }

    Ok(CurvaturePoint {
        threshold: grid[best.0],
        curvature: best.1,
        lambda: spline.lambda,
    })
}
