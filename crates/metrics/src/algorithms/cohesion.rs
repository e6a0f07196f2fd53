use serde::Serialize;
use tracing::debug;

use kappa_core::{
    is_degenerate, Diagnostic, DiagnosticCode, Result, Table, VIABILITY_COLUMNS,
    VIABILITY_INTEGRATED, VIABILITY_ISOLATED,
};

use super::proxy::{weighted_proxy, ProxyEstimate};
use super::stats::{mean, sample_sd};
use crate::config::CohesionConfig;

/// Cohesion Coefficient of a viability table.
#[derive(Debug, Clone, Serialize)]
pub struct CohesionResult {
    /// Mean per-component cohesion.
    #[serde(rename = "C")]
    pub coefficient: f64,
    /// Sample standard deviation of per-component cohesion.
    pub c_sd: Option<f64>,
    /// clamp(1 − isolated / integrated, 0, 1) per row; None where undefined.
    pub component_cohesions: Vec<Option<f64>>,
    /// Share of defined cohesions above the high-cohesion policy threshold.
    pub high_cohesion_proportion: f64,
    pub n_components: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CohesionResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }
}

/// Mean normalised viability loss on isolation.
///
/// Fails only when a required column is absent. An empty table yields
/// C = 0 with a diagnostic. A component more viable alone than integrated
/// gets cohesion 0, never a negative value.
pub fn cohesion_coefficient(table: &Table, config: &CohesionConfig) -> Result<CohesionResult> {
    table.require(&VIABILITY_COLUMNS)?;
    let isolated = table.numeric(VIABILITY_ISOLATED)?;
    let integrated = table.numeric(VIABILITY_INTEGRATED)?;
    let n_components = table.n_rows();

    if n_components == 0 {
        return Ok(CohesionResult {
            coefficient: 0.0,
            c_sd: None,
            component_cohesions: Vec::new(),
            high_cohesion_proportion: 0.0,
            n_components: 0,
            diagnostics: vec![Diagnostic::warn(
                DiagnosticCode::EmptyInput,
                "viability table has no rows; cohesion coefficient set to 0",
            )],
        });
    }

    let mut diagnostics = Vec::new();
    let component_cohesions: Vec<Option<f64>> = isolated
        .iter()
        .zip(&integrated)
        .enumerate()
        .map(|(row, pair)| match pair {
            (Some(iso), Some(int)) if *int > 0.0 => Some((1.0 - iso / int).clamp(0.0, 1.0)),
            (Some(_), Some(int)) => {
                diagnostics.push(Diagnostic::warn(
                    DiagnosticCode::MissingValue,
                    format!("row {}: integrated viability {} is not positive", row, int),
                ));
                None
            }
            _ => {
                diagnostics.push(Diagnostic::warn(
                    DiagnosticCode::MissingValue,
                    format!("row {}: viability value missing", row),
                ));
                None
            }
        })
        .collect();

    let present: Vec<f64> = component_cohesions.iter().flatten().copied().collect();
    let coefficient = match mean(&present) {
        Some(m) => m,
        None => {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCode::EmptyInput,
                "no row has usable viability values; cohesion coefficient set to 0",
            ));
            0.0
        }
    };
    let high_cohesion_proportion = if present.is_empty() {
        0.0
    } else {
        present
            .iter()
            .filter(|&&c| c > config.high_cohesion_threshold)
            .count() as f64
            / present.len() as f64
    };

    debug!(
        components = n_components,
        usable = present.len(),
        coefficient,
        "cohesion coefficient computed"
    );

    Ok(CohesionResult {
        coefficient,
        c_sd: sample_sd(&present),
        component_cohesions,
        high_cohesion_proportion,
        n_components,
        diagnostics,
    })
}

/// Tier 2 cohesion estimate from trait loss and functional dependence
/// scores, both in [0, 1].
pub fn cohesion_proxy(
    trait_loss: f64,
    functional_dependence: f64,
    config: &CohesionConfig,
) -> Result<ProxyEstimate> {
    weighted_proxy(
        ("trait_loss", trait_loss, config.proxy_trait_loss_weight),
        (
            "functional_dependence",
            functional_dependence,
            config.proxy_dependence_weight,
        ),
        config.proxy_uncertainty,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use kappa_core::{FieldValue, KappaError, ViabilityRecord};

    use super::*;

    fn config() -> CohesionConfig {
        CohesionConfig::default()
    }

    #[test]
    fn mean_of_clamped_losses() {
        let table = ViabilityRecord::to_table(&[
            ViabilityRecord::new("a", 0.1, 1.0),  // 0.9
            ViabilityRecord::new("b", 0.5, 1.0),  // 0.5
            ViabilityRecord::new("c", 1.2, 0.8),  // clamped to 0
            ViabilityRecord::new("d", 0.0, 0.5),  // 1.0
        ]);
        let r = cohesion_coefficient(&table, &config()).unwrap();
        assert_abs_diff_eq!(r.coefficient, 0.6, epsilon = 1e-12);
        assert_eq!(r.component_cohesions[2], Some(0.0));
        assert_abs_diff_eq!(r.high_cohesion_proportion, 0.5, epsilon = 1e-12);
        assert_eq!(r.n_components, 4);
        let sd = r.c_sd.unwrap();
        let expected = ((0.09 + 0.01 + 0.36 + 0.16) / 3.0f64).sqrt();
        assert_abs_diff_eq!(sd, expected, epsilon = 1e-12);
        assert!(!r.is_degenerate());
    }

    #[test]
    fn cohesion_always_in_unit_interval() {
        let table = ViabilityRecord::to_table(&[
            ViabilityRecord::new("a", 5.0, 0.1),
            ViabilityRecord::new("b", 0.0, 3.0),
            ViabilityRecord::new("c", 0.7, 0.7),
        ]);
        let r = cohesion_coefficient(&table, &config()).unwrap();
        for c in r.component_cohesions.iter().flatten() {
            assert!((0.0..=1.0).contains(c));
        }
    }

    #[test]
    fn empty_table_is_zero_not_error() {
        let table = ViabilityRecord::to_table(&[]);
        let r = cohesion_coefficient(&table, &config()).unwrap();
        assert_eq!(r.coefficient, 0.0);
        assert_eq!(r.n_components, 0);
        assert!(r.is_degenerate());
    }

    #[test]
    fn missing_column_is_input_error() {
        let table = Table::new("viability")
            .with_column("component_id", vec!["a"])
            .with_column("viability_isolated", vec![0.5]);
        let err = cohesion_coefficient(&table, &config()).unwrap_err();
        assert!(matches!(err, KappaError::MissingColumn { ref column, .. } if column == "viability_integrated"));
    }

    #[test]
    fn missing_values_are_ignored() {
        let table = Table::new("viability")
            .with_column("component_id", vec!["a", "b", "c"])
            .with_column(
                "viability_isolated",
                vec![FieldValue::Float(0.2), FieldValue::Null, FieldValue::Float(0.4)],
            )
            .with_column(
                "viability_integrated",
                vec![FieldValue::Float(1.0), FieldValue::Float(1.0), FieldValue::Float(0.0)],
            );
        let r = cohesion_coefficient(&table, &config()).unwrap();
        assert_eq!(r.component_cohesions, vec![Some(0.8), None, None]);
        assert_abs_diff_eq!(r.coefficient, 0.8, epsilon = 1e-12);
        assert_eq!(r.c_sd, None);
        assert_eq!(r.diagnostics.len(), 2);
        assert!(!r.is_degenerate());
    }

    #[test]
    fn proxy_weights_and_band() {
        let p = cohesion_proxy(0.8, 0.5, &config()).unwrap();
        assert_abs_diff_eq!(p.value, 0.68, epsilon = 1e-12);
        assert_eq!(p.method, "proxy");
        assert_abs_diff_eq!(p.lower, 0.53, epsilon = 1e-12);
        assert_abs_diff_eq!(p.upper, 0.83, epsilon = 1e-12);

        assert!(cohesion_proxy(1.2, 0.5, &config()).is_err());
    }
}
