use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of soft, non-fatal condition met while computing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// No rows, components or nodes to work with.
    EmptyInput,
    /// Graph without edges.
    NoEdges,
    /// Single-node graph; maximum entropy is zero.
    SingleNode,
    /// Total variance zero or undefined.
    ZeroVariance,
    /// Fewer than two collectives; selection level undefined.
    SingleCollective,
    /// Additive prediction was zero and replaced by epsilon.
    ZeroPrediction,
    /// Component entropy was zero.
    ZeroEntropy,
    /// A row was skipped because of a missing or unusable value.
    MissingValue,
    /// A fit could not be produced; a fallback value was returned.
    FitFailed,
    /// An iterative fit stopped without converging but produced an estimate.
    NotConverged,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCode::EmptyInput => write!(f, "empty_input"),
            DiagnosticCode::NoEdges => write!(f, "no_edges"),
            DiagnosticCode::SingleNode => write!(f, "single_node"),
            DiagnosticCode::ZeroVariance => write!(f, "zero_variance"),
            DiagnosticCode::SingleCollective => write!(f, "single_collective"),
            DiagnosticCode::ZeroPrediction => write!(f, "zero_prediction"),
            DiagnosticCode::ZeroEntropy => write!(f, "zero_entropy"),
            DiagnosticCode::MissingValue => write!(f, "missing_value"),
            DiagnosticCode::FitFailed => write!(f, "fit_failed"),
            DiagnosticCode::NotConverged => write!(f, "not_converged"),
        }
    }
}

/// A non-fatal warning attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic and emit it as a `tracing` warning.
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(code = %code, "{}", message);
        Self { code, message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Whether any diagnostic marks the result as a degenerate fallback rather
/// than a computed value. `MissingValue` and `NotConverged` only annotate.
pub fn is_degenerate(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| {
        !matches!(
            d.code,
            DiagnosticCode::MissingValue | DiagnosticCode::NotConverged
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_are_not_degenerate() {
        let diags = vec![Diagnostic::warn(DiagnosticCode::MissingValue, "row 3 skipped")];
        assert!(!is_degenerate(&diags));

        let diags = vec![Diagnostic::warn(DiagnosticCode::NoEdges, "no edges")];
        assert!(is_degenerate(&diags));
    }

    #[test]
    fn code_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticCode::ZeroPrediction).unwrap();
        assert_eq!(json, "\"zero_prediction\"");
    }
}
