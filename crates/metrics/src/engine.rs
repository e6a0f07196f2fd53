use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kappa_core::{Result, Table};
use kappa_graph::{CommunityMethod, InteractionNetwork};

use crate::algorithms::coherence::{hierarchical_coherence, CoherenceResult};
use crate::algorithms::cohesion::{cohesion_coefficient, CohesionResult};
use crate::algorithms::emergence::{emergent_complexity, EmergenceResult, PredictionMethod};
use crate::algorithms::integration::{integration_index, IntegrationResult};
use crate::algorithms::modularity::{modular_independence, ModularityResult};
use crate::config::MetricsConfig;

/// Component values and the measured collective value for one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSet {
    pub components: Vec<f64>,
    pub collective: f64,
    #[serde(default)]
    pub method: PredictionMethod,
}

/// Whatever is known about one biological system. Metrics run only for
/// the inputs that are present.
#[derive(Debug, Clone, Default)]
pub struct SystemData {
    pub name: String,
    pub network: Option<InteractionNetwork>,
    pub viability: Option<Table>,
    pub fitness: Option<Table>,
    pub states: Option<StateSet>,
    /// Overrides the configured default detection method.
    pub community_method: Option<CommunityMethod>,
}

impl SystemData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// All five metrics for one system.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationProfile {
    pub name: String,
    pub integration: Option<IntegrationResult>,
    pub cohesion: Option<CohesionResult>,
    pub modularity: Option<ModularityResult>,
    pub emergence: Option<EmergenceResult>,
    pub coherence: Option<CoherenceResult>,
    pub elapsed_ms: f64,
}

fn timed<T>(label: &str, system: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    debug!(
        system,
        metric = label,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "metric done"
    );
    out
}

impl IntegrationProfile {
    /// Run every metric whose input is present. Fails only on a malformed
    /// table (missing column or non-numeric cell).
    pub fn run_all(system: &SystemData, config: &MetricsConfig) -> Result<Self> {
        let start = Instant::now();
        let name = system.name.as_str();

        let integration = system
            .network
            .as_ref()
            .map(|net| timed("integration", name, || integration_index(net)));

        let method = system
            .community_method
            .unwrap_or(config.modularity.default_method);
        let modularity = system.network.as_ref().map(|net| {
            timed("modularity", name, || {
                modular_independence(net, method, &config.modularity)
            })
        });

        let cohesion = system
            .viability
            .as_ref()
            .map(|t| timed("cohesion", name, || cohesion_coefficient(t, &config.cohesion)))
            .transpose()?;

        let emergence = system.states.as_ref().map(|s| {
            timed("emergence", name, || {
                emergent_complexity(&s.components, s.collective, s.method, &config.emergence)
            })
        });

        let coherence = system
            .fitness
            .as_ref()
            .map(|t| timed("coherence", name, || hierarchical_coherence(t, &config.coherence)))
            .transpose()?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            system = name,
            I = ?integration.as_ref().map(|r| r.index),
            C = ?cohesion.as_ref().map(|r| r.coefficient),
            M = ?modularity.as_ref().map(|r| r.independence),
            E = ?emergence.as_ref().map(|r| r.complexity),
            H = ?coherence.as_ref().map(|r| r.coherence),
            "Profile complete in {:.1}ms",
            elapsed_ms
        );

        Ok(Self {
            name: system.name.clone(),
            integration,
            cohesion,
            modularity,
            emergence,
            coherence,
            elapsed_ms,
        })
    }
}

/// Profile independent systems in parallel. Results keep input order; one
/// malformed system does not affect the others.
pub fn profile_many(systems: &[SystemData], config: &MetricsConfig) -> Vec<Result<IntegrationProfile>> {
    let start = Instant::now();
    let results: Vec<Result<IntegrationProfile>> = systems
        .par_iter()
        .map(|system| IntegrationProfile::run_all(system, config))
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        "Profiled {} systems in {:.1}s ({} failed)",
        systems.len(),
        start.elapsed().as_secs_f64(),
        failed
    );
    results
}
