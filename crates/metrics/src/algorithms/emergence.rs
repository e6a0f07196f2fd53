use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use kappa_core::{is_degenerate, Diagnostic, DiagnosticCode, KappaError};

use super::stats::shannon_entropy_bits;
use crate::config::EmergenceConfig;

/// How the additive expectation is formed from component values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    #[default]
    Sum,
    /// mean × count, which equals the sum.
    Mean,
    Max,
}

impl PredictionMethod {
    /// Additive prediction for a non-empty set of component values.
    pub fn predict(self, components: &[f64]) -> f64 {
        match self {
            PredictionMethod::Sum => components.iter().sum(),
            PredictionMethod::Mean => {
                let mean = components.iter().sum::<f64>() / components.len() as f64;
                mean * components.len() as f64
            }
            PredictionMethod::Max => components.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionMethod::Sum => write!(f, "sum"),
            PredictionMethod::Mean => write!(f, "mean"),
            PredictionMethod::Max => write!(f, "max"),
        }
    }
}

impl FromStr for PredictionMethod {
    type Err = KappaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(PredictionMethod::Sum),
            "mean" => Ok(PredictionMethod::Mean),
            "max" => Ok(PredictionMethod::Max),
            other => Err(KappaError::UnknownMethod {
                kind: "prediction".to_string(),
                name: other.to_string(),
            }),
        }
    }
}

/// Emergent Complexity from observed vs additive collective value.
#[derive(Debug, Clone, Serialize)]
pub struct EmergenceResult {
    /// min(1, deviation).
    #[serde(rename = "E")]
    pub complexity: f64,
    /// |observed − predicted| / predicted.
    pub deviation: f64,
    pub predicted: f64,
    pub observed: f64,
    pub synergistic: bool,
    /// observed / predicted, unclamped.
    pub fold_change: f64,
    pub method: PredictionMethod,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmergenceResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }
}

/// Deviation of a collective measurement from the additive prediction of
/// its parts.
///
/// A prediction of exactly zero is replaced by `prediction_epsilon`; the
/// resulting deviation and fold change are only as precise as that
/// substitute and are flagged with a diagnostic.
pub fn emergent_complexity(
    components: &[f64],
    collective: f64,
    method: PredictionMethod,
    config: &EmergenceConfig,
) -> EmergenceResult {
    if components.is_empty() {
        return EmergenceResult {
            complexity: 0.0,
            deviation: 0.0,
            predicted: 0.0,
            observed: collective,
            synergistic: false,
            fold_change: 0.0,
            method,
            diagnostics: vec![Diagnostic::warn(
                DiagnosticCode::EmptyInput,
                "no component states; emergent complexity set to 0",
            )],
        };
    }

    let mut diagnostics = Vec::new();
    let mut predicted = method.predict(components);
    if predicted == 0.0 {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCode::ZeroPrediction,
            format!(
                "additive prediction is 0; using {} as denominator",
                config.prediction_epsilon
            ),
        ));
        predicted = config.prediction_epsilon;
    }

    let deviation = (collective - predicted).abs() / predicted;
    let complexity = deviation.min(1.0);

    debug!(
        method = %method,
        predicted,
        observed = collective,
        complexity,
        "emergent complexity computed"
    );

    EmergenceResult {
        complexity,
        deviation,
        predicted,
        observed: collective,
        synergistic: collective > predicted,
        fold_change: collective / predicted,
        method,
        diagnostics,
    }
}

/// Information-theoretic Emergent Complexity.
#[derive(Debug, Clone, Serialize)]
pub struct InformationEmergenceResult {
    /// min(1, |MI| / H_components).
    #[serde(rename = "E")]
    pub complexity: f64,
    pub mutual_information: f64,
    /// Sum of component entropies (bits).
    pub h_components: f64,
    /// Entropy of the joint distribution (bits).
    pub h_joint: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl InformationEmergenceResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }
}

/// Emergence as the information shared between components.
///
/// H_components sums the component entropies as if the components were
/// independent; it approximates rather than computes the entropy of the
/// independent product. Masses are used as given (non-positive ones are
/// dropped).
pub fn emergent_information(
    component_distributions: &[Vec<f64>],
    joint_distribution: &[f64],
) -> InformationEmergenceResult {
    let h_components: f64 = component_distributions
        .iter()
        .map(|d| shannon_entropy_bits(d))
        .sum();
    let h_joint = shannon_entropy_bits(joint_distribution);
    let mutual_information = h_components - h_joint;

    let mut diagnostics = Vec::new();
    let complexity = if h_components > 0.0 {
        (mutual_information.abs() / h_components).min(1.0)
    } else {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCode::ZeroEntropy,
            "component entropy is 0; emergent complexity set to 0",
        ));
        0.0
    };

    InformationEmergenceResult {
        complexity,
        mutual_information,
        h_components,
        h_joint,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const PARTS: [f64; 5] = [10.0, 15.0, 12.0, 18.0, 20.0];

    fn config() -> EmergenceConfig {
        EmergenceConfig::default()
    }

    #[test]
    fn synergistic_collective() {
        let r = emergent_complexity(&PARTS, 95.0, PredictionMethod::Sum, &config());
        assert_abs_diff_eq!(r.predicted, 75.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.deviation, 20.0 / 75.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.complexity, 0.266_666_666_7, epsilon = 1e-9);
        assert!(r.synergistic);
        assert_abs_diff_eq!(r.fold_change, 95.0 / 75.0, epsilon = 1e-12);
    }

    #[test]
    fn additive_collective_has_no_emergence() {
        let r = emergent_complexity(&PARTS, 75.0, PredictionMethod::Sum, &config());
        assert_eq!(r.deviation, 0.0);
        assert_eq!(r.complexity, 0.0);
        assert!(!r.synergistic);
    }

    #[test]
    fn mean_and_max_predictions() {
        let mean = emergent_complexity(&PARTS, 95.0, PredictionMethod::Mean, &config());
        assert_abs_diff_eq!(mean.predicted, 75.0, epsilon = 1e-9);

        let max = emergent_complexity(&PARTS, 30.0, PredictionMethod::Max, &config());
        assert_abs_diff_eq!(max.predicted, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(max.complexity, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn large_deviation_saturates() {
        let r = emergent_complexity(&[1.0, 1.0], 10.0, PredictionMethod::Sum, &config());
        assert_eq!(r.complexity, 1.0);
        assert_abs_diff_eq!(r.deviation, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.fold_change, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_prediction_uses_epsilon() {
        let r = emergent_complexity(&[0.0, 0.0], 0.5, PredictionMethod::Sum, &config());
        assert_eq!(r.predicted, 1e-3);
        assert_eq!(r.complexity, 1.0);
        assert!(r.synergistic);
        assert_eq!(r.diagnostics[0].code, DiagnosticCode::ZeroPrediction);
    }

    #[test]
    fn empty_components_are_degenerate() {
        let r = emergent_complexity(&[], 3.0, PredictionMethod::Sum, &config());
        assert_eq!(r.complexity, 0.0);
        assert!(r.is_degenerate());
    }

    #[test]
    fn method_parsing() {
        assert_eq!("MAX".parse::<PredictionMethod>().unwrap(), PredictionMethod::Max);
        assert!("median".parse::<PredictionMethod>().is_err());
    }

    #[test]
    fn information_form() {
        // Two fair coins (1 bit each), perfectly correlated joint over 2 states
        let comps = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let r = emergent_information(&comps, &[0.5, 0.0, 0.0, 0.5]);
        assert_abs_diff_eq!(r.h_components, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.h_joint, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.mutual_information, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.complexity, 0.5, epsilon = 1e-12);

        // Independent joint: no shared information
        let r = emergent_information(&comps, &[0.25; 4]);
        assert_abs_diff_eq!(r.complexity, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn information_zero_entropy_guard() {
        let r = emergent_information(&[vec![1.0]], &[1.0]);
        assert_eq!(r.complexity, 0.0);
        assert_eq!(r.diagnostics[0].code, DiagnosticCode::ZeroEntropy);
    }
}
