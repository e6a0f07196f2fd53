use std::collections::BTreeMap;

use tracing::debug;

use super::normalize_membership;
use crate::network::InteractionNetwork;

/// Upper bound on aggregation levels.
const MAX_LEVELS: usize = 32;
/// Upper bound on local-moving sweeps per level.
const MAX_PASSES: usize = 100;
/// Minimum modularity gain for a move to count.
const MIN_GAIN: f64 = 1e-12;

/// Detect communities by Louvain modularity optimisation.
///
/// Each level sweeps the nodes in index order and moves every node into the
/// neighbouring community with the largest positive modularity gain (ties go
/// to the lowest community number), repeating until a sweep moves nothing.
/// Communities are then collapsed into super-nodes and the process repeats
/// until no node moves.
///
/// Returns a community label per node.
pub fn louvain(network: &InteractionNetwork) -> Vec<usize> {
    let n = network.n_nodes();
    let mut membership: Vec<usize> = (0..n).collect();
    let mut graph = network.undirected_matrix();
    let two_m: f64 = graph.iter().flatten().sum();
    if n == 0 || two_m <= 0.0 {
        return membership;
    }

    for level in 0..MAX_LEVELS {
        let (local, moved) = local_moving(&graph, two_m);
        if !moved {
            debug!("Louvain converged after {} levels", level);
            break;
        }
        let local = normalize_membership(&local);
        for c in membership.iter_mut() {
            *c = local[*c];
        }
        graph = aggregate(&graph, &local);
    }

    membership
}

/// One level of local moving. Returns the community of every (super-)node
/// and whether any node changed community.
fn local_moving(a: &[Vec<f64>], two_m: f64) -> (Vec<usize>, bool) {
    let n = a.len();
    let strengths: Vec<f64> = a.iter().map(|row| row.iter().sum()).collect();
    let mut community: Vec<usize> = (0..n).collect();
    let mut totals = strengths.clone();
    let mut moved_any = false;

    for _ in 0..MAX_PASSES {
        let mut moved = false;

        for i in 0..n {
            let current = community[i];
            let k_i = strengths[i];

            // Link weight from i into each neighbouring community
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for (j, &w) in a[i].iter().enumerate() {
                if j != i && w > 0.0 {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }
            }

            totals[current] -= k_i;

            let mut best = current;
            let mut best_gain =
                links.get(&current).copied().unwrap_or(0.0) - totals[current] * k_i / two_m;
            for (&c, &w) in &links {
                let gain = w - totals[c] * k_i / two_m;
                if gain > best_gain + MIN_GAIN {
                    best = c;
                    best_gain = gain;
                }
            }

            totals[best] += k_i;
            if best != current {
                community[i] = best;
                moved = true;
                moved_any = true;
            }
        }

        if !moved {
            break;
        }
    }

    (community, moved_any)
}

/// Collapse communities into super-nodes. Internal weight lands on the
/// diagonal, so strengths and total weight are preserved.
fn aggregate(a: &[Vec<f64>], community: &[usize]) -> Vec<Vec<f64>> {
    let k = community.iter().max().map_or(0, |max| max + 1);
    let mut b = vec![vec![0.0; k]; k];
    for (i, row) in a.iter().enumerate() {
        for (j, &w) in row.iter().enumerate() {
            b[community[i]][community[j]] += w;
        }
    }
    b
}
