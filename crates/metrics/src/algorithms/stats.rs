//! Small descriptive-statistics helpers shared by the metrics.

/// Shannon entropy in bits. Non-positive masses are dropped before taking
/// logarithms, so `0 · log 0` contributes nothing and `log 0` is never
/// evaluated. Masses are not renormalised.
pub fn shannon_entropy_bits(masses: &[f64]) -> f64 {
    -masses
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.log2())
        .sum::<f64>()
}

/// Entropy of the proportions implied by a set of counts.
pub fn count_entropy_bits(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let probs: Vec<f64> = counts.iter().map(|&c| c as f64 / total as f64).collect();
    shannon_entropy_bits(&probs)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (n − 1 denominator); None below two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

pub fn sample_sd(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}
