#![allow(dead_code)]

use manifolds_sgd::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Euclidean distance between two rows of a flat row-major embedding
pub fn dist(embd: &[f64], i: usize, j: usize, n_dim: usize) -> f64 {
    (0..n_dim)
        .map(|d| {
            let diff = embd[i * n_dim + d] - embd[j * n_dim + d];
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

/// Mean distance over a set of index pairs
pub fn mean_dist(embd: &[f64], pairs: &[(usize, usize)], n_dim: usize) -> f64 {
    pairs.iter().map(|&(i, j)| dist(embd, i, j, n_dim)).sum::<f64>() / pairs.len() as f64
}

/// Create a graph of well-separated groups
///
/// Every group is a ring with random chords inside the group; there are no
/// edges between groups.
///
/// ### Returns
///
/// Tuple of `(graph, labels)`
pub fn create_grouped_graph(
    n_per_group: usize,
    n_groups: usize,
    seed: u64,
) -> (CoordinateList<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_total = n_per_group * n_groups;

    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    let mut labels = Vec::with_capacity(n_total);

    for g in 0..n_groups {
        let offset = g * n_per_group;
        for i in 0..n_per_group {
            labels.push(g);

            let next = offset + (i + 1) % n_per_group;
            let chord = offset + rng.random_range(0..n_per_group);
            for &j in &[next, chord] {
                if j != offset + i {
                    let w: f64 = rng.random_range(0.5..1.0);
                    rows.extend([offset + i, j]);
                    cols.extend([j, offset + i]);
                    vals.extend([w, w]);
                }
            }
        }
    }

    let graph = CoordinateList::new(rows, cols, vals, n_total).unwrap();
    (graph, labels)
}

/// All `(i, j)` pairs with `i < j` split by label equality
///
/// ### Returns
///
/// Tuple of `(intra_pairs, inter_pairs)`
pub fn split_pairs(labels: &[usize]) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let mut intra = Vec::new();
    let mut inter = Vec::new();
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            if labels[i] == labels[j] {
                intra.push((i, j));
            } else {
                inter.push((i, j));
            }
        }
    }
    (intra, inter)
}

/// Deterministic single-threaded parameters
pub fn fixed_params(n_components: usize, n_epochs: usize, seed: u64) -> LayoutParams<f64> {
    LayoutParams {
        n_components,
        n_epochs,
        n_threads: Some(1),
        ..LayoutParams::default_2d().with_seed(seed)
    }
}
