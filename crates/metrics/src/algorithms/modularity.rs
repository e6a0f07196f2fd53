use serde::Serialize;
use tracing::debug;

use kappa_core::{is_degenerate, Diagnostic, DiagnosticCode, KappaError, Result};
use kappa_graph::{detect_communities, CommunityMethod, InteractionNetwork, Partition};

use super::stats::count_entropy_bits;
use crate::config::ModularityConfig;

/// Modular Independence of a network.
#[derive(Debug, Clone, Serialize)]
pub struct ModularityResult {
    /// Affine rescaling of Q into [0, 1].
    #[serde(rename = "M")]
    pub independence: f64,
    pub modularity_q: f64,
    /// Detection algorithm, or `"membership"` for a caller partition.
    pub method: String,
    pub n_communities: usize,
    pub membership: Vec<usize>,
    pub module_sizes: Vec<usize>,
    /// Shannon entropy (bits) of the community-size distribution.
    pub module_entropy: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModularityResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }
}

/// M = clamp((Q + offset) / scale, 0, 1); with the defaults Q = −0.5 maps
/// to 0 and Q = 1 maps to 1.
pub fn rescale_modularity(q: f64, config: &ModularityConfig) -> f64 {
    ((q + config.rescale_offset) / config.rescale_scale).clamp(0.0, 1.0)
}

/// Detect communities with `method` and report how modular the network is.
///
/// Networks with fewer than two nodes or no edges return M = 0 and a single
/// community with a diagnostic. Different methods may disagree on the
/// partition; the method used is reported alongside the result.
pub fn modular_independence(
    network: &InteractionNetwork,
    method: CommunityMethod,
    config: &ModularityConfig,
) -> ModularityResult {
    let n = network.n_nodes();
    let n_edges = network.n_edges();

    if n < 2 || n_edges == 0 {
        return ModularityResult {
            independence: 0.0,
            modularity_q: 0.0,
            method: method.to_string(),
            n_communities: 1,
            membership: vec![0; n],
            module_sizes: vec![n],
            module_entropy: 0.0,
            diagnostics: vec![Diagnostic::warn(
                DiagnosticCode::NoEdges,
                format!(
                    "network has {} nodes and {} edges; modular independence set to 0",
                    n, n_edges
                ),
            )],
        };
    }

    let partition = detect_communities(network, method);
    build_result(partition, method.to_string(), config)
}

/// Score a caller-supplied community assignment instead of running
/// detection. Labels may be arbitrary integers; they are renumbered.
pub fn modularity_from_membership(
    network: &InteractionNetwork,
    membership: &[usize],
    config: &ModularityConfig,
) -> Result<ModularityResult> {
    if membership.len() != network.n_nodes() {
        return Err(KappaError::DimensionMismatch(format!(
            "membership has {} entries for a {}-node network",
            membership.len(),
            network.n_nodes()
        )));
    }

    let partition = Partition::from_membership(network, membership.to_vec());
    let mut result = build_result(partition, "membership".to_string(), config);
    if network.n_edges() == 0 {
        result.diagnostics.push(Diagnostic::warn(
            DiagnosticCode::NoEdges,
            "network has no edges; modularity of the supplied partition is 0",
        ));
    }
    Ok(result)
}

fn build_result(partition: Partition, method: String, config: &ModularityConfig) -> ModularityResult {
    let module_sizes = partition.sizes();
    let module_entropy = count_entropy_bits(&module_sizes);
    let q = partition.modularity;
    let independence = rescale_modularity(q, config);

    debug!(
        method = %method,
        communities = module_sizes.len(),
        q,
        independence,
        "modular independence computed"
    );

    ModularityResult {
        independence,
        modularity_q: q,
        method,
        n_communities: module_sizes.len(),
        membership: partition.membership,
        module_sizes,
        module_entropy,
        diagnostics: Vec::new(),
    }
}
