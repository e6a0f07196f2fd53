use serde::{Deserialize, Serialize};

use crate::network::InteractionNetwork;

/// Size and density of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Observed edges over the maximum possible for a simple graph.
    pub density: f64,
}

pub fn network_stats(network: &InteractionNetwork) -> NetworkStats {
    let total_nodes = network.n_nodes();
    let total_edges = network.n_edges();
    NetworkStats {
        total_nodes,
        total_edges,
        density: density(total_nodes, total_edges, network.is_directed()),
    }
}

/// Density: E / (N(N-1)/2) undirected, E / (N(N-1)) directed.
pub fn density(nodes: usize, edges: usize, directed: bool) -> f64 {
    if nodes < 2 {
        return 0.0;
    }
    let n = nodes as f64;
    let possible = if directed { n * (n - 1.0) } else { n * (n - 1.0) / 2.0 };
    edges as f64 / possible
}
