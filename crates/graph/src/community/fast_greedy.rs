use tracing::debug;

use crate::network::InteractionNetwork;

/// Detect communities by greedy modularity merging (Clauset–Newman–Moore).
///
/// Starts from singletons and repeatedly merges the pair of adjacent
/// communities with the largest ΔQ = 2 (e_ij − a_i a_j), recording Q along
/// the way. Merging continues while adjacent pairs remain; the partition with
/// the highest Q seen is returned. Ties go to the lowest (i, j) pair.
pub fn fast_greedy(network: &InteractionNetwork) -> Vec<usize> {
    let n = network.n_nodes();
    let a = network.undirected_matrix();
    let two_m: f64 = a.iter().flatten().sum();
    let mut membership: Vec<usize> = (0..n).collect();
    if n == 0 || two_m <= 0.0 {
        return membership;
    }

    // e[i][j]: fraction of edge ends joining communities i and j
    let mut e: Vec<Vec<f64>> = a
        .iter()
        .map(|row| row.iter().map(|w| w / two_m).collect())
        .collect();
    let mut share: Vec<f64> = e.iter().map(|row| row.iter().sum()).collect();
    let mut alive = vec![true; n];

    let mut q: f64 = (0..n).map(|i| e[i][i] - share[i] * share[i]).sum();
    let mut best_q = q;
    let mut best_membership = membership.clone();
    let mut merges = 0usize;

    loop {
        let mut best_pair: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !alive[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !alive[j] || e[i][j] <= 0.0 {
                    continue;
                }
                let delta = 2.0 * (e[i][j] - share[i] * share[j]);
                if best_pair.map_or(true, |(_, _, d)| delta > d) {
                    best_pair = Some((i, j, delta));
                }
            }
        }

        let Some((i, j, delta)) = best_pair else {
            break;
        };

        // Merge j into i
        let e_ij = e[i][j];
        for k in 0..n {
            if k != i && k != j {
                e[i][k] += e[j][k];
                e[k][i] = e[i][k];
            }
        }
        e[i][i] += e[j][j] + 2.0 * e_ij;
        for k in 0..n {
            e[j][k] = 0.0;
            e[k][j] = 0.0;
        }
        share[i] += share[j];
        share[j] = 0.0;
        alive[j] = false;
        for c in membership.iter_mut() {
            if *c == j {
                *c = i;
            }
        }

        q += delta;
        merges += 1;
        if q > best_q + 1e-12 {
            best_q = q;
            best_membership = membership.clone();
        }
    }

    debug!("Fast greedy performed {} merges, best Q = {:.4}", merges, best_q);
    best_membership
}

#[cfg(test)]
mod tests {
    use super::super::test_graphs::*;
    use super::super::{modularity, normalize_membership};
    use super::*;

    #[test]
    fn fast_greedy_disconnected_cliques() {
        let net = two_cliques(4, false);
        let labels = normalize_membership(&fast_greedy(&net));
        assert_eq!(labels, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn tracked_q_matches_recomputed_q() {
        let net = two_cliques(5, true);
        let labels = fast_greedy(&net);
        let q = modularity(&net, &normalize_membership(&labels));
        assert!((q - 0.452_380_952).abs() < 1e-6, "q = {}", q);
    }

    #[test]
    fn fast_greedy_clique_merges_to_one() {
        let net = clique(4);
        let labels = normalize_membership(&fast_greedy(&net));
        assert!(labels.iter().all(|&c| c == 0));
    }
}
