use serde::{Deserialize, Serialize};

use kappa_core::{KappaError, Result};

/// Wire shape of a network: optional labels plus a dense weight matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    pub adjacency: Vec<Vec<f64>>,
    #[serde(default)]
    pub directed: bool,
}

/// Interaction network over N labeled nodes, stored as a dense weight matrix.
///
/// The diagonal is ignored. An undirected network reads the matrix
/// symmetrically: the weight of `{i, j}` is `max(w_ij, w_ji)`. A directed
/// network counts every non-zero off-diagonal entry as an arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkSpec", into = "NetworkSpec")]
pub struct InteractionNetwork {
    labels: Vec<String>,
    weights: Vec<Vec<f64>>,
    directed: bool,
}

impl TryFrom<NetworkSpec> for InteractionNetwork {
    type Error = KappaError;

    fn try_from(spec: NetworkSpec) -> Result<Self> {
        match spec.labels {
            Some(labels) => Self::with_labels(labels, spec.adjacency, spec.directed),
            None => Self::from_adjacency(spec.adjacency, spec.directed),
        }
    }
}

impl From<InteractionNetwork> for NetworkSpec {
    fn from(net: InteractionNetwork) -> Self {
        NetworkSpec {
            labels: Some(net.labels),
            adjacency: net.weights,
            directed: net.directed,
        }
    }
}

impl InteractionNetwork {
    /// Build from an adjacency/weight matrix, labelling nodes `1..=N`.
    pub fn from_adjacency(weights: Vec<Vec<f64>>, directed: bool) -> Result<Self> {
        let labels = (1..=weights.len()).map(|i| i.to_string()).collect();
        Self::with_labels(labels, weights, directed)
    }

    /// Build from labels and a matrix; validates shape and entries.
    pub fn with_labels(labels: Vec<String>, weights: Vec<Vec<f64>>, directed: bool) -> Result<Self> {
        let n = weights.len();
        if labels.len() != n {
            return Err(KappaError::DimensionMismatch(format!(
                "{} labels for a {}-node matrix",
                labels.len(),
                n
            )));
        }
        for (i, row) in weights.iter().enumerate() {
            if row.len() != n {
                return Err(KappaError::DimensionMismatch(format!(
                    "adjacency row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(&w) = row.iter().find(|w| !w.is_finite() || **w < 0.0) {
                return Err(KappaError::InvalidValue {
                    column: "adjacency".to_string(),
                    row: i,
                    reason: format!("weight {} is not a finite non-negative number", w),
                });
            }
        }
        Ok(Self {
            labels,
            weights,
            directed,
        })
    }

    /// Build an `n`-node network from `(source, target, weight)` triples.
    /// Repeated pairs accumulate weight.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f64)], directed: bool) -> Result<Self> {
        let mut weights = vec![vec![0.0; n]; n];
        for &(s, t, w) in edges {
            if s >= n || t >= n {
                return Err(KappaError::DimensionMismatch(format!(
                    "edge ({}, {}) references a node outside 0..{}",
                    s, t, n
                )));
            }
            weights[s][t] += w;
            if !directed {
                weights[t][s] += w;
            }
        }
        Self::from_adjacency(weights, directed)
    }

    pub fn n_nodes(&self) -> usize {
        self.weights.len()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Weight of the link between `i` and `j` read without direction.
    pub fn undirected_weight(&self, i: usize, j: usize) -> f64 {
        if i == j {
            0.0
        } else {
            self.weights[i][j].max(self.weights[j][i])
        }
    }

    /// Number of edges (arcs, for a directed network).
    pub fn n_edges(&self) -> usize {
        let n = self.n_nodes();
        if self.directed {
            (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter(|&(i, j)| i != j && self.weights[i][j] > 0.0)
                .count()
        } else {
            (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .filter(|&(i, j)| self.undirected_weight(i, j) > 0.0)
                .count()
        }
    }

    /// Unweighted degree of every node; in + out for directed networks.
    pub fn degrees(&self) -> Vec<usize> {
        let n = self.n_nodes();
        (0..n)
            .map(|i| {
                if self.directed {
                    let out = (0..n).filter(|&j| j != i && self.weights[i][j] > 0.0).count();
                    let inc = (0..n).filter(|&j| j != i && self.weights[j][i] > 0.0).count();
                    out + inc
                } else {
                    (0..n)
                        .filter(|&j| self.undirected_weight(i, j) > 0.0)
                        .count()
                }
            })
            .collect()
    }

    /// Symmetric weight matrix with a zero diagonal, the view community
    /// detection and modularity work on.
    pub fn undirected_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.n_nodes();
        (0..n)
            .map(|i| (0..n).map(|j| self.undirected_weight(i, j)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_square_matrix() {
        let err = InteractionNetwork::from_adjacency(vec![vec![0.0, 1.0], vec![1.0]], false)
            .unwrap_err();
        assert!(matches!(err, KappaError::DimensionMismatch(_)));
    }

    #[test]
    fn rejects_negative_weight() {
        let err = InteractionNetwork::from_adjacency(vec![vec![0.0, -1.0], vec![-1.0, 0.0]], false)
            .unwrap_err();
        assert!(matches!(err, KappaError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn undirected_reads_max_and_ignores_diagonal() {
        let net = InteractionNetwork::from_adjacency(
            vec![
                vec![5.0, 2.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
            ],
            false,
        )
        .unwrap();
        assert_eq!(net.n_edges(), 2);
        assert_eq!(net.degrees(), vec![1, 2, 1]);
        assert_eq!(net.undirected_weight(1, 0), 2.0);
        assert_eq!(net.undirected_matrix()[0], vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn directed_counts_arcs() {
        let net = InteractionNetwork::from_edges(3, &[(0, 1, 1.0), (1, 0, 1.0), (0, 2, 1.0)], true)
            .unwrap();
        assert_eq!(net.n_edges(), 3);
        assert_eq!(net.degrees(), vec![3, 2, 1]);
    }

    #[test]
    fn deserializes_with_validation() {
        let net: InteractionNetwork = serde_json::from_str(
            r#"{"labels": ["a", "b"], "adjacency": [[0, 1], [1, 0]]}"#,
        )
        .unwrap();
        assert!(!net.is_directed());
        let back = serde_json::to_value(&net).unwrap();
        assert_eq!(back["labels"], serde_json::json!(["a", "b"]));

        let bad = serde_json::from_str::<InteractionNetwork>(r#"{"adjacency": [[0, 1]]}"#);
        assert!(bad.is_err());
    }
}
