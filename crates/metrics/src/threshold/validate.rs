use serde::Serialize;
use tracing::info;

use kappa_core::{Diagnostic, DiagnosticCode, Result, Table};

use super::{detect, fit_logistic, max_curvature, ThresholdDataset, ThresholdResult};
use crate::algorithms::stats::{mean, sample_sd};
use crate::config::ThresholdConfig;

/// One alternative estimator's answer; `None` when it could not produce one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodEstimate {
    pub threshold: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MethodEstimate {
    fn defined(threshold: f64, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            threshold: Some(threshold),
            diagnostics,
        }
    }

    fn undefined(method: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            threshold: None,
            diagnostics: vec![Diagnostic::warn(
                DiagnosticCode::FitFailed,
                format!("{}: {}", method, reason),
            )],
        }
    }
}

/// Spread of the defined estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateSummary {
    pub mean: Option<f64>,
    /// Sample SD, `None` with fewer than two estimates.
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub n_methods: usize,
}

impl EstimateSummary {
    pub fn from_estimates(estimates: &[Option<f64>]) -> Self {
        let defined: Vec<f64> = estimates.iter().flatten().copied().collect();
        Self {
            mean: mean(&defined),
            sd: sample_sd(&defined),
            min: defined.iter().copied().reduce(f64::min),
            max: defined.iter().copied().reduce(f64::max),
            n_methods: defined.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMethodValidation {
    pub segmented: ThresholdResult,
    pub logistic_inflection: MethodEstimate,
    pub max_curvature: MethodEstimate,
    pub summary: EstimateSummary,
}

/// Estimate the threshold three independent ways and summarise the
/// agreement. A failing estimator only leaves its own slot undefined.
pub fn validate_multi_method(
    dataset: &ThresholdDataset,
    config: &ThresholdConfig,
) -> MultiMethodValidation {
    let (x, y) = (dataset.predictor(), dataset.outcome());

    let segmented = detect(dataset, config.initial_guess, config);

    let logistic_inflection = match fit_logistic(x, y, config) {
        Ok(fit) if fit.converged => MethodEstimate::defined(fit.inflection, Vec::new()),
        Ok(fit) => MethodEstimate::defined(
            fit.inflection,
            vec![Diagnostic::warn(
                DiagnosticCode::NotConverged,
                format!(
                    "logistic fit stopped after {} iterations; classes may be separated",
                    fit.iterations
                ),
            )],
        ),
        Err(e) => MethodEstimate::undefined("logistic", e),
    };

    let max_curvature = match max_curvature(x, y, config) {
        Ok(point) if point.curvature.is_finite() => {
            MethodEstimate::defined(point.threshold, Vec::new())
        }
        Ok(_) => MethodEstimate::undefined("curvature", "second differences are not finite"),
        Err(e) => MethodEstimate::undefined("curvature", e),
    };

    let summary = EstimateSummary::from_estimates(&[
        segmented.estimate(),
        logistic_inflection.threshold,
        max_curvature.threshold,
    ]);
    info!(
        methods = summary.n_methods,
        mean = ?summary.mean,
        sd = ?summary.sd,
        "multi-method threshold validation"
    );

    MultiMethodValidation {
        segmented,
        logistic_inflection,
        max_curvature,
        summary,
    }
}

/// [`validate_multi_method`] on two named columns of a table.
pub fn validate_in_table(
    table: &Table,
    predictor_col: &str,
    outcome_col: &str,
    config: &ThresholdConfig,
) -> Result<MultiMethodValidation> {
    let dataset = ThresholdDataset::from_table(table, predictor_col, outcome_col)?;
    Ok(validate_multi_method(&dataset, config))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn summary_ignores_undefined() {
        let s = EstimateSummary::from_estimates(&[Some(0.7), None, Some(0.8)]);
        assert_eq!(s.n_methods, 2);
        assert_abs_diff_eq!(s.mean.unwrap(), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(s.sd.unwrap(), (0.005f64).sqrt(), epsilon = 1e-12);
        assert_eq!(s.min, Some(0.7));
        assert_eq!(s.max, Some(0.8));

        let one = EstimateSummary::from_estimates(&[None, Some(0.6), None]);
        assert_eq!(one.sd, None);

        let none = EstimateSummary::from_estimates(&[None, None, None]);
        assert_eq!(none.n_methods, 0);
        assert_eq!(none.mean, None);
    }

    #[test]
    fn degenerate_data_never_escapes() {
        let dataset = ThresholdDataset::new(vec![0.5; 6], vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let v = validate_multi_method(&dataset, &ThresholdConfig::default());
        assert!(v.segmented.is_failed());
        assert_eq!(v.logistic_inflection.threshold, None);
        assert_eq!(v.max_curvature.threshold, None);
        assert_eq!(v.summary.n_methods, 0);
    }

    #[test]
    fn empty_dataset_never_escapes() {
        let dataset = ThresholdDataset::new(Vec::new(), Vec::new()).unwrap();
        let v = validate_multi_method(&dataset, &ThresholdConfig::default());
        assert_eq!(v.summary.n_methods, 0);
        assert_eq!(v.segmented.threshold(), 0.7);
    }

    #[test]
    fn continuous_outcome_outside_unit_interval_skips_logistic() {
        let x: Vec<f64> = (0..40).map(|i| i as f64 / 39.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 2.0 + v + 4.0 * (v - 0.6).max(0.0) + 0.01 * (i as f64).sin())
            .collect();
        let dataset = ThresholdDataset::new(x, y).unwrap();
        let v = validate_multi_method(&dataset, &ThresholdConfig::default());
        assert_eq!(v.logistic_inflection.threshold, None);
        assert_eq!(
            v.logistic_inflection.diagnostics[0].code,
            DiagnosticCode::FitFailed
        );
        assert!(v.max_curvature.threshold.is_some());
        assert_eq!(v.summary.n_methods, 1 + usize::from(!v.segmented.is_failed()));
    }
}
