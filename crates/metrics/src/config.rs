//! Named constants behind every metric, with documented defaults.
//!
//! Loaded from YAML (every field optional) and optionally overridden from the
//! environment, so sensitivity analyses can vary a single constant without
//! touching code.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use kappa_core::config::profiled_env_parse;
use kappa_core::{KappaError, Result};
use kappa_graph::CommunityMethod;

/// All metric and threshold-detection constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub cohesion: CohesionConfig,
    pub modularity: ModularityConfig,
    pub emergence: EmergenceConfig,
    pub coherence: CoherenceConfig,
    pub threshold: ThresholdConfig,
}

// ── Cohesion ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CohesionConfig {
    /// Per-component cohesion above this counts as "high". A policy
    /// constant, unrelated to the κ integration threshold.
    pub high_cohesion_threshold: f64,
    /// Proxy weight on trait loss.
    pub proxy_trait_loss_weight: f64,
    /// Proxy weight on functional dependence.
    pub proxy_dependence_weight: f64,
    /// Half-width of the uncertainty band stated for proxy estimates.
    pub proxy_uncertainty: f64,
}

impl Default for CohesionConfig {
    fn default() -> Self {
        Self {
            high_cohesion_threshold: 0.7,
            proxy_trait_loss_weight: 0.6,
            proxy_dependence_weight: 0.4,
            proxy_uncertainty: 0.15,
        }
    }
}

// ── Modularity ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModularityConfig {
    /// Detection algorithm used when the caller names none.
    pub default_method: CommunityMethod,
    /// M = clamp((Q + offset) / scale, 0, 1).
    pub rescale_offset: f64,
    pub rescale_scale: f64,
}

impl Default for ModularityConfig {
    fn default() -> Self {
        Self {
            default_method: CommunityMethod::Louvain,
            rescale_offset: 0.5,
            rescale_scale: 1.5,
        }
    }
}

// ── Emergence ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmergenceConfig {
    /// Substitute for an additive prediction of exactly zero.
    pub prediction_epsilon: f64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            prediction_epsilon: 1e-3,
        }
    }
}

// ── Coherence ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoherenceConfig {
    /// H reported when the selection level is undefined.
    pub neutral_value: f64,
    /// Proxy weight on the specialization proportion.
    pub proxy_specialization_weight: f64,
    /// Proxy weight on role differentiation.
    pub proxy_differentiation_weight: f64,
    pub proxy_uncertainty: f64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            neutral_value: 0.5,
            proxy_specialization_weight: 0.6,
            proxy_differentiation_weight: 0.4,
            proxy_uncertainty: 0.15,
        }
    }
}

// ── Threshold detection ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Breakpoint seed, also the fallback threshold of a failed fit.
    pub initial_guess: f64,
    /// Reported integration threshold κ (informational).
    pub kappa: f64,
    /// Wald interval multiplier.
    pub wald_z: f64,
    /// Segmented-regression iteration cap.
    pub max_iterations: usize,
    /// Convergence tolerance on the breakpoint, relative to the x-range.
    pub tolerance: f64,
    /// Step halvings tried when an update increases the residual sum of squares.
    pub max_step_halvings: usize,
    /// Logistic IRLS iteration cap.
    pub logistic_max_iterations: usize,
    /// Logistic relative deviance tolerance.
    pub logistic_tolerance: f64,
    /// Smoothing-spline smoothness (R-style `spar`).
    pub spline_spar: f64,
    /// Evaluation grid size for the curvature estimator.
    pub curvature_grid_points: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.7,
            kappa: 0.73,
            wald_z: 1.96,
            max_iterations: 30,
            tolerance: 1e-5,
            max_step_halvings: 10,
            logistic_max_iterations: 25,
            logistic_tolerance: 1e-8,
            spline_spar: 0.5,
            curvature_grid_points: 100,
        }
    }
}

impl MetricsConfig {
    /// Parse a YAML document; absent fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| KappaError::Config(e.to_string()))
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&raw)?;
        info!("Loaded metrics config from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| KappaError::Config(e.to_string()))
    }

    /// Apply environment overrides for the given profile:
    /// `KAPPA_INITIAL_GUESS`, `KAPPA_WALD_Z`, `KAPPA_SPLINE_SPAR`,
    /// `KAPPA_HIGH_COHESION`, `KAPPA_COMMUNITY_METHOD`.
    pub fn with_env_overrides(mut self, profile: &str) -> Self {
        if let Some(v) = profiled_env_parse(profile, "KAPPA_INITIAL_GUESS") {
            self.threshold.initial_guess = v;
        }
        if let Some(v) = profiled_env_parse(profile, "KAPPA_WALD_Z") {
            self.threshold.wald_z = v;
        }
        if let Some(v) = profiled_env_parse(profile, "KAPPA_SPLINE_SPAR") {
            self.threshold.spline_spar = v;
        }
        if let Some(v) = profiled_env_parse(profile, "KAPPA_HIGH_COHESION") {
            self.cohesion.high_cohesion_threshold = v;
        }
        if let Some(v) = profiled_env_parse::<CommunityMethod>(profile, "KAPPA_COMMUNITY_METHOD") {
            self.modularity.default_method = v;
        }
        self
    }
}
