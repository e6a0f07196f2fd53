use serde::Serialize;
use tracing::debug;

use kappa_core::{
    is_degenerate, Diagnostic, DiagnosticCode, FitnessRecord, Result, Table, COLLECTIVE_ID,
    FITNESS, FITNESS_COLUMNS,
};

use super::proxy::{weighted_proxy, ProxyEstimate};
use super::stats::{mean, sample_variance};
use crate::config::CoherenceConfig;

/// Hierarchical Coherence of a fitness table.
#[derive(Debug, Clone, Serialize)]
pub struct CoherenceResult {
    /// Var_between / (Var_between + Var_within).
    #[serde(rename = "H")]
    pub coherence: f64,
    pub var_between: f64,
    pub var_within: f64,
    pub var_total: f64,
    /// Reported identically to H.
    #[serde(rename = "ICC")]
    pub icc: f64,
    pub n_collectives: usize,
    pub n_components: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CoherenceResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }
}

/// Share of fitness variance that lies between collectives.
///
/// Var_between is the size-weighted variance of collective means around the
/// grand mean. Var_within is the *unweighted* mean of each collective's
/// sample variance, not the pooled ANOVA estimator; collectives with a
/// single member contribute no variance term. Fewer than two collectives or
/// a zero/undefined total variance yield the neutral value with a
/// diagnostic.
pub fn hierarchical_coherence(table: &Table, config: &CoherenceConfig) -> Result<CoherenceResult> {
    table.require(&FITNESS_COLUMNS)?;
    let collectives = table.keys(COLLECTIVE_ID)?;
    let fitness = table.numeric(FITNESS)?;

    let mut diagnostics = Vec::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for (row, (collective, value)) in collectives.into_iter().zip(fitness).enumerate() {
        let (Some(collective), Some(value)) = (collective, value) else {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCode::MissingValue,
                format!("row {}: collective id or fitness missing", row),
            ));
            continue;
        };
        match groups.iter_mut().find(|(id, _)| *id == collective) {
            Some((_, values)) => values.push(value),
            None => groups.push((collective, vec![value])),
        }
    }

    let n_collectives = groups.len();
    let n_components: usize = groups.iter().map(|(_, v)| v.len()).sum();
    let all: Vec<f64> = groups.iter().flat_map(|(_, v)| v.iter().copied()).collect();

    let (var_between, var_within) = match mean(&all) {
        Some(grand_mean) => {
            let weighted: f64 = groups
                .iter()
                .map(|(_, v)| {
                    let group_mean = mean(v).unwrap_or(grand_mean);
                    v.len() as f64 * (group_mean - grand_mean).powi(2)
                })
                .sum();
            let between = weighted / n_components as f64;

            let group_variances: Vec<f64> =
                groups.iter().filter_map(|(_, v)| sample_variance(v)).collect();
            let within = mean(&group_variances).unwrap_or(f64::NAN);
            (between, within)
        }
        None => (f64::NAN, f64::NAN),
    };
    let var_total = var_between + var_within;

    let neutral = |diagnostics: Vec<Diagnostic>| CoherenceResult {
        coherence: config.neutral_value,
        var_between,
        var_within,
        var_total,
        icc: config.neutral_value,
        n_collectives,
        n_components,
        diagnostics,
    };

    if n_collectives < 2 {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCode::SingleCollective,
            format!(
                "{} collective(s); selection level undefined, H set to {}",
                n_collectives, config.neutral_value
            ),
        ));
        return Ok(neutral(diagnostics));
    }
    if !var_total.is_finite() || var_total <= 0.0 {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCode::ZeroVariance,
            format!(
                "total variance is {}; H set to {}",
                var_total, config.neutral_value
            ),
        ));
        return Ok(neutral(diagnostics));
    }

    let coherence = var_between / var_total;
    debug!(
        collectives = n_collectives,
        components = n_components,
        var_between,
        var_within,
        coherence,
        "hierarchical coherence computed"
    );

    Ok(CoherenceResult {
        coherence,
        var_between,
        var_within,
        var_total,
        icc: coherence,
        n_collectives,
        n_components,
        diagnostics,
    })
}

/// Build a fitness table from per-collective fitness vectors. Collectives
/// are named `collective_1..`, components `c<g>_<i>`.
pub fn fitness_table_from_groups(groups: &[Vec<f64>]) -> Table {
    let records: Vec<FitnessRecord> = groups
        .iter()
        .enumerate()
        .flat_map(|(g, values)| {
            values.iter().enumerate().map(move |(i, &fitness)| {
                FitnessRecord::new(
                    &format!("collective_{}", g + 1),
                    &format!("c{}_{}", g + 1, i + 1),
                    fitness,
                )
            })
        })
        .collect();
    FitnessRecord::to_table(&records)
}

/// Tier 2 coherence estimate from the proportion of specialised components
/// and the degree of role differentiation, both in [0, 1].
pub fn coherence_proxy(
    specialization_proportion: f64,
    role_differentiation: f64,
    config: &CoherenceConfig,
) -> Result<ProxyEstimate> {
    weighted_proxy(
        (
            "specialization_proportion",
            specialization_proportion,
            config.proxy_specialization_weight,
        ),
        (
            "role_differentiation",
            role_differentiation,
            config.proxy_differentiation_weight,
        ),
        config.proxy_uncertainty,
    )
}
