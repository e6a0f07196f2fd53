use serde::Serialize;

use kappa_core::{ensure_unit_interval, Result};

/// Estimate from subjective Tier 2 scores, used when direct measurement is
/// not available. Carries a wider uncertainty band than a measured metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyEstimate {
    pub value: f64,
    /// Always `"proxy"`.
    pub method: &'static str,
    /// Half-width of the stated uncertainty band.
    pub uncertainty: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Weighted two-score proxy. Both scores must lie in [0, 1].
pub(crate) fn weighted_proxy(
    first: (&str, f64, f64),
    second: (&str, f64, f64),
    uncertainty: f64,
) -> Result<ProxyEstimate> {
    let (first_name, first_value, first_weight) = first;
    let (second_name, second_value, second_weight) = second;
    let a = ensure_unit_interval(first_name, first_value)?;
    let b = ensure_unit_interval(second_name, second_value)?;

    let value = first_weight * a + second_weight * b;
    Ok(ProxyEstimate {
        value,
        method: "proxy",
        uncertainty,
        lower: (value - uncertainty).max(0.0),
        upper: (value + uncertainty).min(1.0),
    })
}
