//! Community detection over the undirected, weighted view of a network.
//!
//! Three agglomerative/optimising strategies are available behind the closed
//! [`CommunityMethod`] enum. Each is deterministic for a given input, but the
//! partitions they return are not bit-comparable with other implementations
//! of the same algorithms (visit order and tie-breaking differ), so callers
//! should compare structure and Q, not raw labels.

pub mod fast_greedy;
pub mod louvain;
pub mod walktrap;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use kappa_core::KappaError;

use crate::network::InteractionNetwork;

/// Community detection algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityMethod {
    /// Multi-level modularity optimisation.
    #[default]
    Louvain,
    /// Random-walk distance agglomeration (Pons & Latapy).
    Walktrap,
    /// Greedy modularity merging (Clauset, Newman & Moore).
    FastGreedy,
}

impl fmt::Display for CommunityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommunityMethod::Louvain => write!(f, "louvain"),
            CommunityMethod::Walktrap => write!(f, "walktrap"),
            CommunityMethod::FastGreedy => write!(f, "fast_greedy"),
        }
    }
}

impl FromStr for CommunityMethod {
    type Err = KappaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "louvain" => Ok(CommunityMethod::Louvain),
            "walktrap" => Ok(CommunityMethod::Walktrap),
            "fast_greedy" | "fastgreedy" | "fast-greedy" => Ok(CommunityMethod::FastGreedy),
            other => Err(KappaError::UnknownMethod {
                kind: "community detection".to_string(),
                name: other.to_string(),
            }),
        }
    }
}

/// A partition of the nodes into communities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Community index per node, numbered `0..k` by first appearance.
    pub membership: Vec<usize>,
    /// Newman modularity Q of this partition.
    pub modularity: f64,
}

impl Partition {
    /// Score a membership vector against a network.
    pub fn from_membership(network: &InteractionNetwork, membership: Vec<usize>) -> Self {
        let membership = normalize_membership(&membership);
        let modularity = modularity(network, &membership);
        Self {
            membership,
            modularity,
        }
    }

    pub fn n_communities(&self) -> usize {
        self.membership.iter().max().map_or(0, |max| max + 1)
    }

    /// Size of each community, indexed by community number.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_communities()];
        for &c in &self.membership {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Run the chosen detection algorithm.
pub fn detect_communities(network: &InteractionNetwork, method: CommunityMethod) -> Partition {
    let membership = match method {
        CommunityMethod::Louvain => louvain::louvain(network),
        CommunityMethod::Walktrap => walktrap::walktrap(network, walktrap::DEFAULT_STEPS),
        CommunityMethod::FastGreedy => fast_greedy::fast_greedy(network),
    };
    let partition = Partition::from_membership(network, membership);
    debug!(
        method = %method,
        communities = partition.n_communities(),
        q = partition.modularity,
        "community detection finished"
    );
    partition
}

/// Relabel communities `0..k` in order of first appearance.
pub fn normalize_membership(membership: &[usize]) -> Vec<usize> {
    let mut relabel: HashMap<usize, usize> = HashMap::new();
    membership
        .iter()
        .map(|&c| {
            let next = relabel.len();
            *relabel.entry(c).or_insert(next)
        })
        .collect()
}

/// Newman modularity of a partition on the undirected weighted view:
///
/// Q = (1/2m) Σ_ij [A_ij − k_i k_j / 2m] δ(c_i, c_j)
///
/// Returns 0 for a network without edge weight.
pub fn modularity(network: &InteractionNetwork, membership: &[usize]) -> f64 {
    let a = network.undirected_matrix();
    modularity_of_matrix(&a, membership)
}

/// [`modularity`] over a symmetric matrix; diagonal entries are treated as
/// ordered-pair weight inside the node (as produced by aggregation).
pub(crate) fn modularity_of_matrix(a: &[Vec<f64>], membership: &[usize]) -> f64 {
    let n = a.len();
    let strengths: Vec<f64> = a.iter().map(|row| row.iter().sum()).collect();
    let two_m: f64 = strengths.iter().sum();
    if two_m <= 0.0 {
        return 0.0;
    }

    let k = membership.iter().max().map_or(0, |max| max + 1);
    let mut internal = vec![0.0; k];
    let mut totals = vec![0.0; k];
    for i in 0..n {
        totals[membership[i]] += strengths[i];
        for j in 0..n {
            if membership[i] == membership[j] {
                internal[membership[i]] += a[i][j];
            }
        }
    }

    internal
        .iter()
        .zip(&totals)
        .map(|(&inside, &tot)| inside / two_m - (tot / two_m).powi(2))
        .sum()
}

#[cfg(test)]
pub(crate) mod test_graphs {
    use super::*;

    /// Two cliques of `size` nodes each, optionally joined by one bridge.
    pub fn two_cliques(size: usize, bridge: bool) -> InteractionNetwork {
        let mut edges = Vec::new();
        for offset in [0, size] {
            for i in 0..size {
                for j in (i + 1)..size {
                    edges.push((offset + i, offset + j, 1.0));
                }
            }
        }
        if bridge {
            edges.push((size - 1, size, 1.0));
        }
        InteractionNetwork::from_edges(2 * size, &edges, false).unwrap()
    }

    pub fn clique(size: usize) -> InteractionNetwork {
        let mut edges = Vec::new();
        for i in 0..size {
            for j in (i + 1)..size {
                edges.push((i, j, 1.0));
            }
        }
        InteractionNetwork::from_edges(size, &edges, false).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_graphs::*;
    use super::*;

    #[test]
    fn method_parsing() {
        assert_eq!("louvain".parse::<CommunityMethod>().unwrap(), CommunityMethod::Louvain);
        assert_eq!("Walktrap".parse::<CommunityMethod>().unwrap(), CommunityMethod::Walktrap);
        assert_eq!(
            "fast_greedy".parse::<CommunityMethod>().unwrap(),
            CommunityMethod::FastGreedy
        );
        assert!("infomap".parse::<CommunityMethod>().is_err());
        assert_eq!(CommunityMethod::default(), CommunityMethod::Louvain);
        assert_eq!(CommunityMethod::FastGreedy.to_string(), "fast_greedy");
    }

    #[test]
    fn modularity_of_disconnected_cliques() {
        // Two equal disconnected cliques split correctly: Q = 2 * (1/2 - 1/4) = 0.5
        let net = two_cliques(4, false);
        let q = modularity(&net, &[0, 0, 0, 0, 1, 1, 1, 1]);
        assert!((q - 0.5).abs() < 1e-12);
    }

    #[test]
    fn modularity_single_community_is_zero() {
        let net = clique(5);
        assert!(modularity(&net, &[0; 5]).abs() < 1e-12);
    }

    #[test]
    fn modularity_hand_calculated() {
        // Path 0-1-2-3 split {0,1} {2,3}: m = 3, internal = 2 edges,
        // totals = 3 and 3 → Q = 2/3 - 2 * (3/6)^2 = 1/6
        let net =
            InteractionNetwork::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)], false)
                .unwrap();
        let q = modularity(&net, &[0, 0, 1, 1]);
        assert!((q - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn modularity_without_edges_is_zero() {
        let net = InteractionNetwork::from_adjacency(vec![vec![0.0; 3]; 3], false).unwrap();
        assert_eq!(modularity(&net, &[0, 1, 2]), 0.0);
    }

    #[test]
    fn normalize_relabels_by_first_appearance() {
        assert_eq!(normalize_membership(&[7, 7, 3, 9, 3]), vec![0, 0, 1, 2, 1]);
    }

    #[test]
    fn every_method_separates_bridged_cliques() {
        let net = two_cliques(5, true);
        for method in [
            CommunityMethod::Louvain,
            CommunityMethod::Walktrap,
            CommunityMethod::FastGreedy,
        ] {
            let p = detect_communities(&net, method);
            assert_eq!(p.n_communities(), 2, "{method} found {:?}", p.membership);
            assert_eq!(p.sizes(), vec![5, 5], "{method}");
            assert!(p.modularity > 0.4, "{method} q = {}", p.modularity);
        }
    }
}
