use thiserror::Error;

/// Hard failures: the input breaks the contract of the operation.
///
/// Degenerate-but-valid inputs never produce one of these; they come back as
/// a regular result carrying a [`crate::Diagnostic`].
#[derive(Error, Debug)]
pub enum KappaError {
    #[error("missing required column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("unknown {kind} method: '{name}'")]
    UnknownMethod { kind: String, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for KappaError {
    fn from(e: serde_json::Error) -> Self {
        KappaError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KappaError>;

/// Reject a score that must be a proportion.
pub fn ensure_unit_interval(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(KappaError::OutOfRange {
            name: name.to_string(),
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}
