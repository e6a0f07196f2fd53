use serde::Serialize;
use tracing::debug;

use kappa_core::{is_degenerate, Diagnostic, DiagnosticCode};
use kappa_graph::{network_stats, InteractionNetwork};

use super::stats::shannon_entropy_bits;

/// Integration Index of an interaction network.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationResult {
    /// I = 1 − H_observed / H_max, in [0, 1].
    #[serde(rename = "I")]
    pub index: f64,
    /// Shannon entropy (bits) of the degree distribution.
    pub h_observed: f64,
    /// log2(N): entropy of a uniform degree distribution.
    pub h_max: f64,
    /// Observed edges over possible edges.
    pub connectivity: f64,
    pub n_nodes: usize,
    pub n_edges: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl IntegrationResult {
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.diagnostics)
    }

    fn degenerate(n_nodes: usize, n_edges: usize, diagnostic: Diagnostic) -> Self {
        Self {
            index: 0.0,
            h_observed: 0.0,
            h_max: 0.0,
            connectivity: 0.0,
            n_nodes,
            n_edges,
            diagnostics: vec![diagnostic],
        }
    }
}

/// Entropy-based integration score from the degree distribution.
///
/// p_i = deg_i / Σ deg over nodes with non-zero degree. A hub-dominated
/// network has a concentrated distribution and a high I; a regular network
/// has I = 0. Graphs without nodes or edges return a zeroed result with a
/// diagnostic instead of failing.
pub fn integration_index(network: &InteractionNetwork) -> IntegrationResult {
    let stats = network_stats(network);
    let n_nodes = stats.total_nodes;
    let n_edges = stats.total_edges;

    let degrees = network.degrees();
    let total_degree: usize = degrees.iter().sum();

    if n_nodes == 1 {
        return IntegrationResult::degenerate(
            n_nodes,
            n_edges,
            Diagnostic::warn(
                DiagnosticCode::SingleNode,
                "maximum entropy is zero for a single node; integration index set to 0",
            ),
        );
    }
    if n_nodes == 0 || n_edges == 0 || total_degree == 0 {
        return IntegrationResult::degenerate(
            n_nodes,
            n_edges,
            Diagnostic::warn(
                DiagnosticCode::NoEdges,
                format!(
                    "network has {} nodes and {} edges; integration index set to 0",
                    n_nodes, n_edges
                ),
            ),
        );
    }

    let probs: Vec<f64> = degrees
        .iter()
        .filter(|&&d| d > 0)
        .map(|&d| d as f64 / total_degree as f64)
        .collect();
    let h_observed = shannon_entropy_bits(&probs);
    let h_max = (n_nodes as f64).log2();

    // N >= 2 here, so h_max > 0
    let index = (1.0 - h_observed / h_max).clamp(0.0, 1.0);

    debug!(
        nodes = n_nodes,
        edges = n_edges,
        h_observed,
        h_max,
        index,
        "integration index computed"
    );

    IntegrationResult {
        index,
        h_observed,
        h_max,
        connectivity: stats.density,
        n_nodes,
        n_edges,
        diagnostics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn complete(n: usize) -> InteractionNetwork {
        let mut adj = vec![vec![1.0; n]; n];
        for (i, row) in adj.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        InteractionNetwork::from_adjacency(adj, false).unwrap()
    }

    fn star(n: usize) -> InteractionNetwork {
        let edges: Vec<(usize, usize, f64)> = (1..n).map(|leaf| (0, leaf, 1.0)).collect();
        InteractionNetwork::from_edges(n, &edges, false).unwrap()
    }

    #[test]
    fn complete_graph_has_zero_index() {
        let r = integration_index(&complete(6));
        assert_abs_diff_eq!(r.h_observed, r.h_max, epsilon = 1e-12);
        assert_abs_diff_eq!(r.index, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.connectivity, 1.0, epsilon = 1e-12);
        assert_eq!(r.n_edges, 15);
        assert!(!r.is_degenerate());
    }

    #[test]
    fn star_is_more_integrated_than_complete() {
        let s = integration_index(&star(6));
        let c = integration_index(&complete(6));
        assert!(s.index > c.index);
        // degrees 5,1,1,1,1,1 over T = 10
        let expected_h = -(0.5 * 0.5f64.log2() + 5.0 * 0.1 * 0.1f64.log2());
        assert_abs_diff_eq!(s.h_observed, expected_h, epsilon = 1e-12);
        assert_abs_diff_eq!(s.index, 1.0 - expected_h / 6f64.log2(), epsilon = 1e-12);
        assert!((0.0..=1.0).contains(&s.connectivity));
    }

    #[test]
    fn isolated_nodes_are_dropped_from_distribution() {
        // path 0-1-2 plus isolated node 3
        let net =
            InteractionNetwork::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0)], false).unwrap();
        let r = integration_index(&net);
        assert_abs_diff_eq!(r.h_observed, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(r.h_max, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.index, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn empty_and_edgeless_networks_are_degenerate() {
        let empty = InteractionNetwork::from_adjacency(Vec::new(), false).unwrap();
        let r = integration_index(&empty);
        assert_eq!(r.index, 0.0);
        assert!(r.is_degenerate());

        let edgeless = InteractionNetwork::from_adjacency(vec![vec![0.0; 4]; 4], false).unwrap();
        let r = integration_index(&edgeless);
        assert_eq!(r.index, 0.0);
        assert_eq!(r.connectivity, 0.0);
        assert_eq!(r.n_nodes, 4);
        assert_eq!(r.diagnostics[0].code, DiagnosticCode::NoEdges);
    }

    #[test]
    fn single_node_never_produces_nan() {
        let one = InteractionNetwork::from_adjacency(vec![vec![1.0]], false).unwrap();
        let r = integration_index(&one);
        assert_eq!(r.index, 0.0);
        assert!(!r.index.is_nan());
        assert_eq!(r.n_nodes, 1);
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].code, DiagnosticCode::SingleNode);
    }

    #[test]
    fn directed_network_uses_total_degree() {
        let net = InteractionNetwork::from_edges(3, &[(0, 1, 1.0), (0, 2, 1.0)], true).unwrap();
        let r = integration_index(&net);
        // degrees 2,1,1 over T = 4 → H = 1.5
        assert_abs_diff_eq!(r.h_observed, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(r.connectivity, 2.0 / 6.0, epsilon = 1e-12);
    }
}
