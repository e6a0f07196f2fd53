//! Logistic regression by iteratively reweighted least squares.

use nalgebra::{Matrix2, Vector2};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ThresholdConfig;

/// Fitted probabilities are kept this far from 0 and 1.
const MU_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogisticFailure {
    #[error("need at least 2 complete rows, got {0}")]
    TooFewRows(usize),
    #[error("outcome {value} at row {row} is outside [0, 1]")]
    OutcomeOutOfRange { row: usize, value: f64 },
    #[error("non-finite predictor or outcome value")]
    NonFinite,
    #[error("predictor is constant")]
    ConstantPredictor,
    #[error("weighted normal equations are singular")]
    SingularFit,
    #[error("fitted slope is zero; the log-odds never cross zero")]
    ZeroSlope,
    #[error("inflection point is not finite")]
    NonFiniteEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticFit {
    pub intercept: f64,
    pub slope: f64,
    /// −intercept / slope: where the fitted log-odds cross zero.
    pub inflection: f64,
    pub deviance: f64,
    pub iterations: usize,
    /// False when the iteration cap was hit, typically under separation.
    pub converged: bool,
}

fn sigmoid(eta: f64) -> f64 {
    (1.0 / (1.0 + (-eta).exp())).clamp(MU_EPS, 1.0 - MU_EPS)
}

fn y_log_ratio(y: f64, mu: f64) -> f64 {
    if y > 0.0 {
        y * (y / mu).ln()
    } else {
        0.0
    }
}

fn deviance(y: &[f64], mu: &[f64]) -> f64 {
    2.0 * y
        .iter()
        .zip(mu)
        .map(|(&y, &m)| y_log_ratio(y, m) + y_log_ratio(1.0 - y, 1.0 - m))
        .sum::<f64>()
}

/// Fit logit(μ) = β0 + β1·x to outcomes in [0, 1].
///
/// Convergence follows the relative-deviance rule
/// |dev − dev_prev| / (|dev| + 0.1) < tolerance.
pub fn fit_logistic(
    x: &[f64],
    y: &[f64],
    config: &ThresholdConfig,
) -> Result<LogisticFit, LogisticFailure> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(LogisticFailure::TooFewRows(n));
    }
    let (x, y) = (&x[..n], &y[..n]);
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(LogisticFailure::NonFinite);
    }
    if let Some((row, &value)) = y.iter().enumerate().find(|(_, v)| !(0.0..=1.0).contains(*v)) {
        return Err(LogisticFailure::OutcomeOutOfRange { row, value });
    }
    if x.iter().all(|&v| v == x[0]) {
        return Err(LogisticFailure::ConstantPredictor);
    }

    let mut mu: Vec<f64> = y.iter().map(|&v| (v + 0.5) / 2.0).collect();
    let mut eta: Vec<f64> = mu.iter().map(|&m| (m / (1.0 - m)).ln()).collect();
    let mut dev_prev = deviance(y, &mu);
    let mut beta: Option<Vector2<f64>> = None;
    let mut dev = dev_prev;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.logistic_max_iterations {
        iterations += 1;
        let mut a = Matrix2::<f64>::zeros();
        let mut b = Vector2::<f64>::zeros();
        for i in 0..n {
            let w = mu[i] * (1.0 - mu[i]);
            let z = eta[i] + (y[i] - mu[i]) / w;
            let row = Vector2::new(1.0, x[i]);
            a += w * row * row.transpose();
            b += w * z * row;
        }
        let Some(next) = a.try_inverse().map(|inv| inv * b) else {
            break;
        };
        if next.iter().any(|c| !c.is_finite()) {
            break;
        }

        beta = Some(next);
        for i in 0..n {
            eta[i] = next[0] + next[1] * x[i];
            mu[i] = sigmoid(eta[i]);
        }
        dev = deviance(y, &mu);
        debug!(iteration = iterations, deviance = dev, "logistic update");
        if (dev - dev_prev).abs() / (dev.abs() + 0.1) < config.logistic_tolerance {
            converged = true;
            break;
        }
        dev_prev = dev;
    }

    let beta = beta.ok_or(LogisticFailure::SingularFit)?;
    let (intercept, slope) = (beta[0], beta[1]);
    if slope == 0.0 {
        return Err(LogisticFailure::ZeroSlope);
    }
    let inflection = -intercept / slope;
    if !inflection.is_finite() {
        return Err(LogisticFailure::NonFiniteEstimate);
    }

    Ok(LogisticFit {
        intercept,
        slope,
        inflection,
        deviance: dev,
        iterations,
        converged,
    })
}
