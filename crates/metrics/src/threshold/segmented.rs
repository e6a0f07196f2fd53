//! Two-regime (broken-stick) regression by iterative re-linearization.
//!
//! The model is y = β0 + β1·x + β2·(x − ψ)₊. Around a current ψ the
//! breakpoint term is linearised by adding V = −1{x > ψ} as a regressor;
//! its coefficient γ gives the update ψ ← ψ + γ/β2. An update that raises
//! the residual sum of squares is halved until it does not.

use nalgebra::DVector;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::regression::{design_with_intercept, least_squares, LinearFit};
use crate::config::ThresholdConfig;

/// |β2| below this (relative to 1 + |β1|) means no regime change to locate.
const SLOPE_CHANGE_EPS: f64 = 1e-8;

/// Minimum rows for a breakpoint fit.
pub const MIN_ROWS: usize = 4;

/// Why a segmented fit was abandoned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("need at least 4 complete rows, got {0}")]
    TooFewRows(usize),
    #[error("predictor is constant")]
    ConstantPredictor,
    #[error("outcome is constant")]
    ConstantOutcome,
    #[error("non-finite predictor or outcome value")]
    NonFinite,
    #[error("initial guess {seed} is outside the predictor range ({min}, {max})")]
    SeedOutsideRange { seed: f64, min: f64, max: f64 },
    #[error("design matrix is singular")]
    SingularDesign,
    #[error("no change in slope to locate a breakpoint at")]
    NoSlopeChange,
    #[error("breakpoint estimate {0} left the predictor range")]
    LeftRange(f64),
    #[error("breakpoint did not converge in {0} iterations")]
    NotConverged(usize),
    #[error("breakpoint standard error is undefined")]
    UndefinedStandardError,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Slopes {
    pub left: f64,
    pub right: f64,
}

/// A converged breakpoint fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedFit {
    pub threshold: f64,
    /// Delta-method standard error of the breakpoint.
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub r2_linear: f64,
    pub r2_segmented: f64,
    pub r2_improvement: f64,
    pub slopes: Slopes,
    pub iterations: usize,
    pub n: usize,
}

fn hinge(x: &[f64], psi: f64) -> Vec<f64> {
    x.iter().map(|&v| (v - psi).max(0.0)).collect()
}

fn step_indicator(x: &[f64], psi: f64) -> Vec<f64> {
    x.iter().map(|&v| if v > psi { -1.0 } else { 0.0 }).collect()
}

fn hinge_fit(x: &[f64], y: &DVector<f64>, psi: f64) -> Option<LinearFit> {
    let u = hinge(x, psi);
    least_squares(&design_with_intercept(&[x, &u]), y)
}

fn relinearized_fit(x: &[f64], y: &DVector<f64>, psi: f64) -> Option<LinearFit> {
    let u = hinge(x, psi);
    let v = step_indicator(x, psi);
    least_squares(&design_with_intercept(&[x, &u, &v]), y)
}

/// Breakpoint search path: every accepted ψ has an RSS no larger than the
/// one before it.
struct BreakpointSearch {
    psi: f64,
    iterations: usize,
    rss_path: Vec<f64>,
}

/// Iterate ψ ← ψ + γ/β2 from `seed`, halving the step until the hinge RSS
/// does not increase. Stops when the full step, or the accepted move, is
/// below `tolerance · range(x)`. A direction along which no halved step
/// improves the fit is a failure to converge.
fn locate_breakpoint(
    x: &[f64],
    y: &DVector<f64>,
    seed: f64,
    config: &ThresholdConfig,
) -> Result<BreakpointSearch, FitFailure> {
    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let tolerance = config.tolerance * (x_max - x_min);
    let interior = |psi: f64| psi.is_finite() && psi > x_min && psi < x_max;

    let mut psi = seed;
    let mut rss = hinge_fit(x, y, psi).ok_or(FitFailure::SingularDesign)?.rss;
    let mut rss_path = vec![rss];
    let mut iterations = 0;
    while iterations < config.max_iterations {
        iterations += 1;
        let fit = relinearized_fit(x, y, psi).ok_or(FitFailure::SingularDesign)?;
        let (beta1, beta2, gamma) = (fit.coef(1), fit.coef(2), fit.coef(3));
        if beta2.abs() < SLOPE_CHANGE_EPS * (1.0 + beta1.abs()) {
            return Err(FitFailure::NoSlopeChange);
        }

        let full_step = gamma / beta2;
        if full_step.abs() < tolerance {
            debug!(iteration = iterations, psi, full_step, "breakpoint converged");
            return Ok(BreakpointSearch { psi, iterations, rss_path });
        }

        let mut step = full_step;
        let mut accepted = None;
        let mut reached_interior = false;
        for _ in 0..=config.max_step_halvings {
            let candidate = psi + step;
            if interior(candidate) {
                reached_interior = true;
                if let Some(f) = hinge_fit(x, y, candidate) {
                    if f.rss <= rss {
                        accepted = Some((candidate, f.rss));
                        break;
                    }
                }
            }
            step /= 2.0;
        }
        let Some((candidate, candidate_rss)) = accepted else {
            if !reached_interior {
                return Err(FitFailure::LeftRange(psi + full_step));
            }
            return Err(FitFailure::NotConverged(iterations));
        };

        debug!(iteration = iterations, psi = candidate, step, rss = candidate_rss, "breakpoint update");
        psi = candidate;
        rss = candidate_rss;
        rss_path.push(rss);
        if step.abs() < tolerance {
            return Ok(BreakpointSearch { psi, iterations, rss_path });
        }
    }
    Err(FitFailure::NotConverged(iterations))
}

/// Fit a single breakpoint seeded at `initial_guess`.
pub fn fit_segmented(
    x: &[f64],
    y: &[f64],
    initial_guess: f64,
    config: &ThresholdConfig,
) -> Result<SegmentedFit, FitFailure> {
    let n = x.len().min(y.len());
    if n < MIN_ROWS {
        return Err(FitFailure::TooFewRows(n));
    }
    let (x, y) = (&x[..n], &y[..n]);
    if x.iter().chain(y).any(|v| !v.is_finite()) || !initial_guess.is_finite() {
        return Err(FitFailure::NonFinite);
    }

    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = x_max - x_min;
    if range <= 0.0 {
        return Err(FitFailure::ConstantPredictor);
    }
    if y.iter().all(|&v| v == y[0]) {
        return Err(FitFailure::ConstantOutcome);
    }
    let interior = |psi: f64| psi > x_min && psi < x_max;
    if !interior(initial_guess) {
        return Err(FitFailure::SeedOutsideRange {
            seed: initial_guess,
            min: x_min,
            max: x_max,
        });
    }

    let yv = DVector::from_column_slice(y);
    let linear = least_squares(&design_with_intercept(&[x]), &yv).ok_or(FitFailure::SingularDesign)?;

    let search = locate_breakpoint(x, &yv, initial_guess, config)?;
    let (psi, iterations) = (search.psi, search.iterations);
    debug!(psi, iterations, accepted_moves = search.rss_path.len() - 1, "breakpoint search done");

    let final_fit = relinearized_fit(x, &yv, psi).ok_or(FitFailure::SingularDesign)?;
    let (beta2, gamma) = (final_fit.coef(2), final_fit.coef(3));
    if beta2.abs() < SLOPE_CHANGE_EPS * (1.0 + final_fit.coef(1).abs()) {
        return Err(FitFailure::NoSlopeChange);
    }
    let ratio = gamma / beta2;
    let variance = (final_fit.cov(3, 3) + ratio * ratio * final_fit.cov(2, 2)
        - 2.0 * ratio * final_fit.cov(2, 3))
        / (beta2 * beta2);
    let se = variance.sqrt();
    if !se.is_finite() {
        return Err(FitFailure::UndefinedStandardError);
    }

    let broken = hinge_fit(x, &yv, psi).ok_or(FitFailure::SingularDesign)?;
    let slopes = Slopes {
        left: broken.coef(1),
        right: broken.coef(1) + broken.coef(2),
    };

    Ok(SegmentedFit {
        threshold: psi,
        se,
        ci_lower: psi - config.wald_z * se,
        ci_upper: psi + config.wald_z * se,
        r2_linear: linear.r2,
        r2_segmented: broken.r2,
        r2_improvement: broken.r2 - linear.r2,
        slopes,
        iterations,
        n,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// Broken stick at `psi` with a small deterministic wobble.
    fn broken_stick(n: usize, psi: f64) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let y = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 0.2 + 0.1 * v + 2.0 * (v - psi).max(0.0) + 0.01 * (i as f64 * 1.7).sin())
            .collect();
        (x, y)
    }

    #[test]
    fn recovers_breakpoint() {
        let (x, y) = broken_stick(61, 0.73);
        let fit = fit_segmented(&x, &y, 0.7, &ThresholdConfig::default()).unwrap();
        assert_abs_diff_eq!(fit.threshold, 0.73, epsilon = 0.05);
        assert!(fit.ci_lower < fit.threshold && fit.threshold < fit.ci_upper);
        assert!(fit.r2_improvement > 0.0);
        assert_abs_diff_eq!(fit.slopes.left, 0.1, epsilon = 0.1);
        assert_abs_diff_eq!(fit.slopes.right, 2.1, epsilon = 0.2);
        assert_eq!(fit.n, 61);
    }

    #[test]
    fn wald_interval_uses_configured_multiplier() {
        let (x, y) = broken_stick(61, 0.5);
        let config = ThresholdConfig {
            wald_z: 1.0,
            ..ThresholdConfig::default()
        };
        let fit = fit_segmented(&x, &y, 0.4, &config).unwrap();
        assert_abs_diff_eq!(fit.ci_upper - fit.threshold, fit.se, epsilon = 1e-12);
    }

    /// n noisy points on a hinge at 0.7; `state` drives a small LCG.
    fn noisy_hinge(n: usize, state: &mut u64) -> (Vec<f64>, Vec<f64>) {
        let mut next = || {
            *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (*state >> 11) as f64 / (1u64 << 53) as f64
        };
        let x: Vec<f64> = (0..n).map(|_| next()).collect();
        let y = x
            .iter()
            .map(|&v| 0.1 + 0.2 * v + 1.5 * (v - 0.7).max(0.0) + 0.3 * (next() - 0.5))
            .collect();
        (x, y)
    }

    #[test]
    fn accepted_moves_never_raise_rss() {
        let config = ThresholdConfig::default();
        let mut state = 42;
        let mut converged = 0;
        for _ in 0..400 {
            let (x, y) = noisy_hinge(40, &mut state);
            let yv = DVector::from_column_slice(&y);
            let Ok(search) = locate_breakpoint(&x, &yv, 0.7, &config) else {
                continue;
            };
            converged += 1;
            for pair in search.rss_path.windows(2) {
                assert!(pair[1] <= pair[0], "rss rose from {} to {}", pair[0], pair[1]);
            }
            let final_rss = hinge_fit(&x, &yv, search.psi).unwrap().rss;
            assert_abs_diff_eq!(final_rss, *search.rss_path.last().unwrap(), epsilon = 1e-12);
        }
        assert!(converged > 0);
    }

    #[test]
    fn straight_line_has_no_breakpoint() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 / 19.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.5 + 0.3 * v).collect();
        let err = fit_segmented(&x, &y, 0.7, &ThresholdConfig::default()).unwrap_err();
        assert_eq!(err, FitFailure::NoSlopeChange);
    }

    #[test]
    fn degenerate_inputs() {
        let c = ThresholdConfig::default();
        assert_eq!(
            fit_segmented(&[0.5; 10], &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0], 0.5, &c),
            Err(FitFailure::ConstantPredictor)
        );
        assert_eq!(
            fit_segmented(&[0.1, 0.2, 0.3], &[0.0, 1.0, 1.0], 0.2, &c),
            Err(FitFailure::TooFewRows(3))
        );
        assert_eq!(
            fit_segmented(&[0.1, 0.2, 0.3, 0.4, 0.5], &[1.0; 5], 0.3, &c),
            Err(FitFailure::ConstantOutcome)
        );
        assert!(matches!(
            fit_segmented(&[0.1, 0.2, 0.3, 0.4, 0.5], &[0.0, 0.0, 1.0, 1.0, 1.0], 0.9, &c),
            Err(FitFailure::SeedOutsideRange { .. })
        ));
    }
}
