use tracing::debug;

use super::modularity;
use crate::network::InteractionNetwork;

/// Random-walk length used when none is given.
pub const DEFAULT_STEPS: usize = 4;

/// A community in the agglomeration, with the distribution of a `t`-step
/// walk started from a uniformly chosen member.
struct Cluster {
    size: usize,
    probs: Vec<f64>,
}

/// Detect communities by walktrap agglomeration (Pons & Latapy).
///
/// Every node gets a self-loop weighted by its mean incident weight so the
/// walk is aperiodic. Adjacent communities are merged in order of the
/// smallest increase Δσ in mean squared walk distance; the cut of the merge
/// sequence with the highest modularity is returned.
pub fn walktrap(network: &InteractionNetwork, steps: usize) -> Vec<usize> {
    let n = network.n_nodes();
    let a = network.undirected_matrix();
    let total: f64 = a.iter().flatten().sum();
    let mut membership: Vec<usize> = (0..n).collect();
    if n == 0 || total <= 0.0 {
        return membership;
    }

    let mut w = a.clone();
    for (i, row) in w.iter_mut().enumerate() {
        let incident: Vec<f64> = row.iter().copied().filter(|&x| x > 0.0).collect();
        row[i] = if incident.is_empty() {
            1.0
        } else {
            incident.iter().sum::<f64>() / incident.len() as f64
        };
    }
    let degree: Vec<f64> = w.iter().map(|row| row.iter().sum()).collect();

    let transition: Vec<Vec<f64>> = w
        .iter()
        .zip(&degree)
        .map(|(row, d)| row.iter().map(|x| x / d).collect())
        .collect();
    let mut walk = transition.clone();
    for _ in 1..steps.max(1) {
        walk = mat_mul(&walk, &transition);
    }

    let mut clusters: Vec<Option<Cluster>> = walk
        .into_iter()
        .map(|probs| Some(Cluster { size: 1, probs }))
        .collect();
    let mut adjacent: Vec<Vec<bool>> = a
        .iter()
        .map(|row| row.iter().map(|&x| x > 0.0).collect())
        .collect();

    let mut sigma = vec![vec![f64::INFINITY; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if adjacent[i][j] {
                let s = delta_sigma(&clusters, i, j, &degree, n);
                sigma[i][j] = s;
                sigma[j][i] = s;
            }
        }
    }

    let mut best_q = modularity(network, &membership);
    let mut best_membership = membership.clone();

    loop {
        let mut pair: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if clusters[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if clusters[j].is_none() || !adjacent[i][j] {
                    continue;
                }
                if pair.map_or(true, |(_, _, s)| sigma[i][j] < s) {
                    pair = Some((i, j, sigma[i][j]));
                }
            }
        }
        let Some((i, j, _)) = pair else {
            break;
        };

        // Merge j into i
        if let (Some(ci), Some(cj)) = (clusters[i].take(), clusters[j].take()) {
            let size = ci.size + cj.size;
            let probs = ci
                .probs
                .iter()
                .zip(&cj.probs)
                .map(|(p, q)| (ci.size as f64 * p + cj.size as f64 * q) / size as f64)
                .collect();
            clusters[i] = Some(Cluster { size, probs });
        }
        for k in 0..n {
            let joined = adjacent[i][k] || adjacent[j][k];
            adjacent[i][k] = joined && k != i && k != j;
            adjacent[k][i] = adjacent[i][k];
            adjacent[j][k] = false;
            adjacent[k][j] = false;
        }
        for c in membership.iter_mut() {
            if *c == j {
                *c = i;
            }
        }
        for k in 0..n {
            if adjacent[i][k] && clusters[k].is_some() {
                let s = delta_sigma(&clusters, i, k, &degree, n);
                sigma[i][k] = s;
                sigma[k][i] = s;
            }
        }

        let q = modularity(network, &membership);
        if q > best_q + 1e-12 {
            best_q = q;
            best_membership = membership.clone();
        }
    }

    debug!("Walktrap best cut Q = {:.4}", best_q);
    best_membership
}

/// Δσ(C1, C2) = (1/n) · |C1||C2| / (|C1| + |C2|) · Σ_k (P_C1k − P_C2k)² / d(k)
fn delta_sigma(clusters: &[Option<Cluster>], i: usize, j: usize, degree: &[f64], n: usize) -> f64 {
    let (Some(ci), Some(cj)) = (&clusters[i], &clusters[j]) else {
        return f64::INFINITY;
    };
    let distance: f64 = ci
        .probs
        .iter()
        .zip(&cj.probs)
        .zip(degree)
        .map(|((p, q), d)| (p - q).powi(2) / d)
        .sum();
    let (si, sj) = (ci.size as f64, cj.size as f64);
    (si * sj / (si + sj)) * distance / n as f64
}

fn mat_mul(x: &[Vec<f64>], y: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut out = vec![vec![0.0; n]; n];
    for i in 0..n {
        for k in 0..n {
            let xik = x[i][k];
            if xik == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i][j] += xik * y[k][j];
            }
        }
    }
    out
}
