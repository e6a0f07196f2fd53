//! Breakpoint detection on (predictor, outcome) pairs and its cross-check
//! against independent estimators.

pub mod logistic;
mod regression;
pub mod segmented;
pub mod spline;
pub mod validate;

use serde::Serialize;
use tracing::{info, warn};

use kappa_core::{KappaError, Result, Table};

use crate::config::ThresholdConfig;

pub use logistic::{fit_logistic, LogisticFailure, LogisticFit};
pub use segmented::{fit_segmented, FitFailure, SegmentedFit, Slopes};
pub use spline::{max_curvature, CurvaturePoint, SmoothingSpline, SplineFailure};
pub use validate::{
    validate_in_table, validate_multi_method, EstimateSummary, MethodEstimate,
    MultiMethodValidation,
};

/// Paired predictor/outcome observations with incomplete rows removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdDataset {
    predictor: Vec<f64>,
    outcome: Vec<f64>,
    /// Rows discarded for a missing or non-finite value.
    dropped: usize,
}

impl ThresholdDataset {
    /// Pair two equal-length vectors, dropping rows where either value is
    /// not finite.
    pub fn new(predictor: Vec<f64>, outcome: Vec<f64>) -> Result<Self> {
        if predictor.len() != outcome.len() {
            return Err(KappaError::DimensionMismatch(format!(
                "predictor has {} values, outcome has {}",
                predictor.len(),
                outcome.len()
            )));
        }
        let total = predictor.len();
        let (predictor, outcome): (Vec<f64>, Vec<f64>) = predictor
            .into_iter()
            .zip(outcome)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .unzip();
        let dropped = total - predictor.len();
        Ok(Self {
            predictor,
            outcome,
            dropped,
        })
    }

    /// Extract two numeric columns. Fails only when a column is absent;
    /// a missing or non-numeric cell drops its row.
    pub fn from_table(table: &Table, predictor_col: &str, outcome_col: &str) -> Result<Self> {
        table.require(&[predictor_col, outcome_col])?;
        let (xs, bad_x) = numeric_cells(table, predictor_col);
        let (ys, bad_y) = numeric_cells(table, outcome_col);
        let (predictor, outcome): (Vec<f64>, Vec<f64>) = xs
            .into_iter()
            .zip(ys)
            .filter_map(|pair| match pair {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
                _ => None,
            })
            .unzip();
        let dropped = table.n_rows() - predictor.len();
        if dropped > 0 {
            warn!(
                table = %table.name,
                dropped,
                non_numeric = bad_x + bad_y,
                "rows with a missing or non-numeric predictor or outcome were dropped"
            );
        }
        Ok(Self {
            predictor,
            outcome,
            dropped,
        })
    }

    pub fn predictor(&self) -> &[f64] {
        &self.predictor
    }

    pub fn outcome(&self) -> &[f64] {
        &self.outcome
    }

    pub fn len(&self) -> usize {
        self.predictor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictor.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Cells of a present column as numbers, with unparseable cells as `None`,
/// plus the count of those unparseable cells.
fn numeric_cells(table: &Table, column: &str) -> (Vec<Option<f64>>, usize) {
    let mut invalid = 0;
    let values = table
        .column(column)
        .map(|c| {
            c.values
                .iter()
                .map(|v| {
                    v.as_f64().unwrap_or_else(|_| {
                        invalid += 1;
                        None
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    (values, invalid)
}

/// A breakpoint fit that fell back to the seed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFit {
    /// The initial guess, returned unchanged.
    pub threshold: f64,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
    pub reason: String,
}

/// Outcome of [`detect`]: a converged fit or a populated fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ThresholdResult {
    Segmented(SegmentedFit),
    Failed(FailedFit),
}

impl ThresholdResult {
    pub fn threshold(&self) -> f64 {
        match self {
            ThresholdResult::Segmented(fit) => fit.threshold,
            ThresholdResult::Failed(failed) => failed.threshold,
        }
    }

    /// Wald interval, defined only for a converged fit.
    pub fn ci(&self) -> Option<(f64, f64)> {
        match self {
            ThresholdResult::Segmented(fit) => Some((fit.ci_lower, fit.ci_upper)),
            ThresholdResult::Failed(_) => None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            ThresholdResult::Segmented(_) => "segmented",
            ThresholdResult::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ThresholdResult::Failed(_))
    }

    /// Breakpoint estimate, `None` when the fit failed.
    pub fn estimate(&self) -> Option<f64> {
        match self {
            ThresholdResult::Segmented(fit) => Some(fit.threshold),
            ThresholdResult::Failed(_) => None,
        }
    }
}

/// Fit a breakpoint seeded at `initial_guess`. Never fails: any fitting
/// problem yields [`ThresholdResult::Failed`] carrying the seed.
pub fn detect(
    dataset: &ThresholdDataset,
    initial_guess: f64,
    config: &ThresholdConfig,
) -> ThresholdResult {
    match fit_segmented(dataset.predictor(), dataset.outcome(), initial_guess, config) {
        Ok(fit) => {
            info!(
                threshold = fit.threshold,
                ci_lower = fit.ci_lower,
                ci_upper = fit.ci_upper,
                r2_improvement = fit.r2_improvement,
                iterations = fit.iterations,
                "breakpoint located"
            );
            ThresholdResult::Segmented(fit)
        }
        Err(e) => {
            warn!(error = %e, initial_guess, "segmented fit failed; falling back to initial guess");
            ThresholdResult::Failed(FailedFit {
                threshold: initial_guess,
                ci_lower: None,
                ci_upper: None,
                reason: e.to_string(),
            })
        }
    }
}

/// [`detect`] on two named columns of a table.
pub fn detect_in_table(
    table: &Table,
    predictor_col: &str,
    outcome_col: &str,
    initial_guess: f64,
    config: &ThresholdConfig,
) -> Result<ThresholdResult> {
    let dataset = ThresholdDataset::from_table(table, predictor_col, outcome_col)?;
    Ok(detect(&dataset, initial_guess, config))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use kappa_core::FieldValue;

    use super::*;

    fn hinge_dataset() -> ThresholdDataset {
        let x: Vec<f64> = (0..81).map(|i| i as f64 / 80.0).collect();
        let y = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 0.05 + 0.2 * v + 3.0 * (v - 0.73).max(0.0) + 0.02 * (i as f64 * 2.3).cos())
            .collect();
        ThresholdDataset::new(x, y).unwrap()
    }

    #[test]
    fn detects_known_breakpoint() {
        let result = detect(&hinge_dataset(), 0.7, &ThresholdConfig::default());
        assert_eq!(result.method(), "segmented");
        assert_abs_diff_eq!(result.threshold(), 0.73, epsilon = 0.05);
        let (lo, hi) = result.ci().unwrap();
        assert!(lo < result.threshold() && result.threshold() < hi);
        match result {
            ThresholdResult::Segmented(fit) => assert!(fit.r2_improvement > 0.0),
            ThresholdResult::Failed(_) => unreachable!(),
        }
    }

    #[test]
    fn constant_predictor_falls_back_to_guess() {
        let dataset = ThresholdDataset::new(vec![0.4; 12], (0..12).map(|i| (i % 2) as f64).collect())
            .unwrap();
        let result = detect(&dataset, 0.7, &ThresholdConfig::default());
        assert!(result.is_failed());
        assert_eq!(result.threshold(), 0.7);
        assert_eq!(result.ci(), None);
        assert_eq!(result.estimate(), None);
    }

    #[test]
    fn linear_relation_falls_back_to_guess() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 29.0).collect();
        let y = x.iter().map(|v| 1.0 - 0.8 * v).collect();
        let result = detect(&ThresholdDataset::new(x, y).unwrap(), 0.7, &ThresholdConfig::default());
        assert_eq!(result.method(), "failed");
        assert_eq!(result.threshold(), 0.7);
    }

    #[test]
    fn serialized_with_method_tag() {
        let dataset = ThresholdDataset::new(vec![1.0, 2.0], vec![0.0, 1.0]).unwrap();
        let result = detect(&dataset, 0.7, &ThresholdConfig::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "failed");
        assert_eq!(json["threshold"], 0.7);
        assert!(json["ci_lower"].is_null());
    }

    #[test]
    fn dataset_drops_incomplete_rows() {
        let table = Table::new("systems")
            .with_column(
                "cohesion",
                vec![FieldValue::Float(0.2), FieldValue::Null, FieldValue::Float(0.9)],
            )
            .with_column(
                "irreversible",
                vec![FieldValue::Integer(0), FieldValue::Integer(1), FieldValue::Integer(1)],
            );
        let dataset = ThresholdDataset::from_table(&table, "cohesion", "irreversible").unwrap();
        assert_eq!(dataset.predictor(), &[0.2, 0.9]);
        assert_eq!(dataset.outcome(), &[0.0, 1.0]);
        assert_eq!(dataset.dropped(), 1);

        let with_nan = ThresholdDataset::new(vec![0.1, f64::NAN], vec![1.0, 0.0]).unwrap();
        assert_eq!(with_nan.len(), 1);
        assert!(ThresholdDataset::new(vec![0.1], vec![]).is_err());
    }

    #[test]
    fn non_numeric_cells_drop_their_row() {
        let table = Table::new("systems")
            .with_column(
                "cohesion",
                vec![
                    FieldValue::Float(0.2),
                    FieldValue::Text("high".into()),
                    FieldValue::Float(0.9),
                ],
            )
            .with_column(
                "irreversible",
                vec![FieldValue::Integer(0), FieldValue::Integer(1), FieldValue::Text("?".into())],
            );
        let dataset = ThresholdDataset::from_table(&table, "cohesion", "irreversible").unwrap();
        assert_eq!(dataset.predictor(), &[0.2]);
        assert_eq!(dataset.dropped(), 2);

        let result = detect_in_table(&table, "cohesion", "irreversible", 0.7, &ThresholdConfig::default());
        assert!(result.unwrap().is_failed());
    }

    #[test]
    fn missing_column_is_the_only_table_error() {
        let table = Table::new("systems").with_column("cohesion", vec![0.1, 0.2]);
        assert!(matches!(
            detect_in_table(&table, "cohesion", "irreversible", 0.7, &ThresholdConfig::default()),
            Err(KappaError::MissingColumn { .. })
        ));
    }
}
