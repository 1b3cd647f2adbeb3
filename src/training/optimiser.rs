use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thousands::*;

use crate::data::structures::*;
use crate::error::{LayoutError, Result};
use crate::training::embedding::*;
use crate::training::gradients::OptimConstants;
use crate::training::sampler::EdgeSampler;
use crate::training::schedule::*;
use crate::training::LayoutParams;

/////////////
// Helpers //
/////////////

/// Build the worker pool for the epochs
///
/// ### Params
///
/// * `n_threads` - Optional number of workers. `None` uses the rayon default.
///
/// ### Returns
///
/// The pool or `LayoutError::ThreadPool` if it could not be created
fn build_pool(n_threads: Option<usize>) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(n_threads.unwrap_or(0))
        .thread_name(|i| format!("layout-worker-{}", i))
        .build()?;
    Ok(pool)
}

/// Run one epoch on the pool and turn a worker panic into an error
///
/// ### Params
///
/// * `pool` - The worker pool
/// * `epoch` - Current epoch, reported in the error
/// * `f` - The epoch's work
///
/// ### Returns
///
/// `LayoutError::DispatchFailed` if any worker panicked
pub(crate) fn dispatch<F>(pool: &ThreadPool, epoch: usize, f: F) -> Result<()>
where
    F: FnOnce() + Send,
{
    catch_unwind(AssertUnwindSafe(|| pool.install(f))).map_err(|panic_info| {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic in layout worker".to_string()
        };
        LayoutError::DispatchFailed { epoch, message }
    })
}

/////////////////////
// Batch optimiser //
/////////////////////

/// Perform one epoch of stochastic gradient descent over all edges
///
/// Every edge is handled by its own task. An edge whose next sample is due
/// pulls its two endpoints together and then pushes its source away from
/// the number of negative samples it owes since its last firing. Negative
/// samples are drawn from the tail embedding with a per-edge deterministic
/// stream and are never moved themselves. All coordinate writes are atomic
/// adds; the order of writes between edges is unspecified.
///
/// ### Params
///
/// * `head` - Embedding being optimised (rows of the graph)
/// * `tail` - Embedding it is optimised against (columns of the graph). The
///   same object as `head` when fitting.
/// * `graph` - Edge list; `schedule` has one entry per edge
/// * `schedule` - Sampling schedule, counters are advanced in place
/// * `consts` - Curve and repulsion constants
/// * `move_other` - Apply the attractive update to the tail endpoint too
/// * `alpha` - Learning rate of this epoch
/// * `epoch` - Current epoch
/// * `seed` - Seed of this epoch for the negative sampling
#[allow(clippy::too_many_arguments)]
pub fn optimise_batch<T>(
    head: &AtomicEmbedding<T>,
    tail: &AtomicEmbedding<T>,
    graph: &CoordinateList<T>,
    schedule: &mut EdgeSchedule<T>,
    consts: &OptimConstants<T>,
    move_other: bool,
    alpha: T,
    epoch: usize,
    seed: u64,
) where
    T: AtomicFloat,
{
    let n_dim = head.n_components();
    let n_tail = tail.n_vertices();
    let epoch_t = T::from_usize(epoch).unwrap();

    let EdgeSchedule {
        epochs_per_sample,
        epochs_per_negative_sample,
        counters,
    } = schedule;

    counters
        .par_iter_mut()
        .enumerate()
        .for_each(|(edge_idx, state)| {
            let eps = epochs_per_sample[edge_idx];
            if !is_due(eps, state, epoch_t) {
                return;
            }

            let j = graph.row_indices[edge_idx];
            let k = graph.col_indices[edge_idx];

            // attraction
            let dist_sq = head.squared_dist(j, tail, k);
            let attr_coeff = consts.attractive(dist_sq);

            for d in 0..n_dim {
                let grad_d = consts.clip(attr_coeff * (head.get(j, d) - tail.get(k, d)));
                head.add(j, d, grad_d * alpha);
                if move_other {
                    tail.add(k, d, -grad_d * alpha);
                }
            }

            state.next_sample = state.next_sample + eps;

            // repulsion
            let epns = epochs_per_negative_sample[edge_idx];
            let n_neg_samples = n_negative_samples(epns, state, epoch_t);

            let mut sampler = EdgeSampler::new(seed, edge_idx);
            for _ in 0..n_neg_samples {
                let t = sampler.next_vertex(n_tail);
                let dist_sq = head.squared_dist(j, tail, t);

                if dist_sq > T::zero() {
                    let rep_coeff = consts.repulsive(dist_sq);
                    for d in 0..n_dim {
                        let grad_d = consts.clip(rep_coeff * (head.get(j, d) - tail.get(t, d)));
                        head.add(j, d, grad_d * alpha);
                    }
                } else if j == t {
                    continue;
                } else {
                    // coincident with another point: maximal push along the diagonal
                    for d in 0..n_dim {
                        head.add(j, d, consts.clip_val * alpha);
                    }
                }
            }

            state.next_negative_sample =
                state.next_negative_sample + T::from_usize(n_neg_samples).unwrap() * epns;
        });
}

///////////////////
// Layout driver //
///////////////////

/// Optimise the layout over the full epoch budget
///
/// Runs `n_epochs` epochs of [`optimise_batch`] one after the other with a
/// linearly decaying learning rate. Fitting (head and tail are the same
/// object) moves both endpoints of an edge, transforming (distinct objects)
/// keeps the tail fixed. After each epoch the optional callback receives a
/// snapshot of the head embedding.
///
/// ### Params
///
/// * `head` - Embedding being optimised
/// * `tail` - Reference embedding; pass `head` again when fitting
/// * `graph` - Pruned edge list, rows index `head`, columns index `tail`
/// * `schedule` - Sampling schedule matching `graph`
/// * `params` - Layout parameters
/// * `n_epochs` - Resolved epoch budget
///
/// ### Returns
///
/// `Ok(())` after all epochs, or the first dispatch failure. On failure the
/// embedding is left partially updated.
pub fn optimise_layout<T>(
    head: &AtomicEmbedding<T>,
    tail: &AtomicEmbedding<T>,
    graph: &CoordinateList<T>,
    schedule: &mut EdgeSchedule<T>,
    params: &LayoutParams<T>,
    n_epochs: usize,
) -> Result<()>
where
    T: AtomicFloat,
{
    params.validate()?;
    crate::ensure_same_len!(graph.values, schedule.epochs_per_sample, schedule.counters);

    if head.n_components() != tail.n_components() || head.n_components() != params.n_components
    {
        return Err(LayoutError::InvalidParameter(format!(
            "dimensionality mismatch: head {}, tail {}, params {}",
            head.n_components(),
            tail.n_components(),
            params.n_components
        )));
    }
    if let Some(&r) = graph.row_indices.iter().find(|&&r| r >= head.n_vertices()) {
        return Err(LayoutError::VertexOutOfBounds {
            index: r,
            n_vertices: head.n_vertices(),
        });
    }
    if let Some(&c) = graph.col_indices.iter().find(|&&c| c >= tail.n_vertices()) {
        return Err(LayoutError::VertexOutOfBounds {
            index: c,
            n_vertices: tail.n_vertices(),
        });
    }

    let move_other = std::ptr::eq(head, tail);
    let consts = OptimConstants::new(params.a, params.b, params.gamma);
    let pool = build_pool(params.n_threads)?;

    if params.verbose {
        tracing::info!(
            "Optimising embedding ({} epochs) on {} edges using {} threads...",
            n_epochs,
            graph.nnz().separate_with_underscores(),
            pool.current_num_threads()
        );
    }

    for epoch in 0..n_epochs {
        let alpha = learning_rate(params.initial_alpha, epoch, n_epochs);
        let seed = params.seed.seed_for_epoch(epoch);

        dispatch(&pool, epoch, || {
            optimise_batch(
                head, tail, graph, schedule, &consts, move_other, alpha, epoch, seed,
            )
        })?;

        if let Some(callback) = &params.callback {
            callback.on_epoch_end(epoch, &head.snapshot());
        }

        if params.verbose && ((epoch + 1) % 50 == 0 || epoch + 1 == n_epochs) {
            tracing::info!(" Completed epoch {}/{}", epoch + 1, n_epochs);
        } else {
            tracing::trace!(epoch, "epoch done");
        }
    }

    Ok(())
}

///////////
// Tests //
///////////
