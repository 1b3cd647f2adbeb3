#![allow(clippy::needless_range_loop)] // I like loops ... !

//! Parallel layout optimisation for fuzzy simplicial set embeddings.
//!
//! Given the weighted 1-skeleton of a UMAP-style fuzzy simplicial set and an
//! initial low-dimensional placement, the optimiser refines the coordinates by
//! stochastic gradient descent: edges pull their endpoints together, randomly
//! drawn negative samples push them apart. One epoch processes all edges in
//! parallel and writes into the shared embedding with atomic adds.

pub mod data;
pub mod error;
pub mod macros;
pub mod prelude;
pub mod training;

use num_traits::Float;
use std::time::Instant;
use thousands::*;

use crate::data::graph::*;
use crate::data::structures::*;
use crate::error::{LayoutError, Result};
use crate::training::embedding::*;
use crate::training::optimiser::*;
use crate::training::schedule::*;
use crate::training::*;

/////////////
// Helpers //
/////////////

/// Prune the graph and derive its sampling schedule
///
/// Drops every edge lighter than `max_weight / n_epochs` (the graph shrinks
/// in place) and computes epochs-per-sample for the survivors.
///
/// ### Params
///
/// * `graph` - Weighted graph, pruned in place
/// * `n_epochs` - Resolved epoch budget
/// * `negative_sample_rate` - Negative samples per positive sample
/// * `verbose` - Controls verbosity
///
/// ### Returns
///
/// The schedule, one entry per surviving edge
pub fn prepare_schedule<T>(
    graph: &mut CoordinateList<T>,
    n_epochs: usize,
    negative_sample_rate: usize,
    verbose: bool,
) -> EdgeSchedule<T>
where
    T: Float + num_traits::FromPrimitive + Send + Sync + std::fmt::Debug,
{
    threshold_weak_edges(graph, n_epochs, verbose);

    let epochs_per_sample = make_epochs_per_sample(&graph.values, n_epochs);

    if verbose {
        tracing::info!(epochs_per_sample = ?epochs_per_sample, "epochs per sample");
    } else {
        tracing::debug!(n_edges = epochs_per_sample.len(), "computed epochs per sample");
    }

    EdgeSchedule::new(epochs_per_sample, negative_sample_rate)
}

/// Check that a flat buffer holds `n_vertices x n_components` values
fn check_shape<T>(buffer: &[T], n_vertices: usize, n_components: usize) -> Result<()> {
    let expected = n_vertices * n_components;
    if buffer.len() != expected {
        return Err(LayoutError::EmbeddingShape {
            expected,
            got: buffer.len(),
        });
    }
    Ok(())
}

//////////////
// Launcher //
//////////////

/// Embed a fuzzy simplicial set by optimising the layout in place
///
/// 1. Resolve the epoch budget (500 epochs up to 10,000 vertices, 200 above,
///    unless set explicitly)
/// 2. Remove edges lighter than `max_weight / n_epochs`
/// 3. Derive the per-edge sampling schedule
/// 4. Run the epochs with the embedding optimised against itself
///
/// ### Params
///
/// * `graph` - Square weighted graph over all points; pruned in place
/// * `embedding` - Row-major initial coordinates of shape
///   `n_vertices x n_components`, overwritten with the result
/// * `params` - Layout parameters
///
/// ### Returns
///
/// `Ok(())` once all epochs are done. An empty graph leaves the embedding
/// untouched. On a dispatch failure the embedding holds a partially
/// optimised state.
///
/// ### Example
///
/// ```ignore
/// let mut graph = CoordinateList::new(rows, cols, weights, n)?;
/// let mut embd = random_layout::<f32>(n, 2, 42, Some(1.0));
/// embed_graph(&mut graph, &mut embd, &LayoutParams::default_2d().with_seed(42))?;
/// ```
pub fn embed_graph<T>(
    graph: &mut CoordinateList<T>,
    embedding: &mut [T],
    params: &LayoutParams<T>,
) -> Result<()>
where
    T: AtomicFloat,
{
    params.validate()?;
    let n_vertices = graph.n_samples();
    check_shape(embedding, n_vertices, params.n_components)?;

    let start = Instant::now();
    let n_epochs = params.resolve_n_epochs(n_vertices);

    if params.verbose {
        tracing::info!(
            "Embedding {} vertices with {} edges, a = {:.4?}, b = {:.4?}",
            n_vertices.separate_with_underscores(),
            graph.nnz().separate_with_underscores(),
            params.a,
            params.b
        );
    }

    let mut schedule = prepare_schedule(graph, n_epochs, params.negative_sample_rate, params.verbose);

    let shared = AtomicEmbedding::from_slice(embedding, params.n_components)?;
    let res = optimise_layout(&shared, &shared, graph, &mut schedule, params, n_epochs);
    // hand back whatever state was reached, also on failure
    shared.write_to(embedding)?;
    res?;

    if params.verbose {
        tracing::info!("Optimised embedding in: {:.2?}.", start.elapsed());
    }

    Ok(())
}

/// Place new points against a fixed reference embedding
///
/// Same pipeline as [`embed_graph`], but the graph rows index the new
/// points (`head`) and the columns index the reference points (`tail`).
/// Only `head` moves.
///
/// ### Params
///
/// * `graph` - Graph of shape `(n_head, n_tail)`; pruned in place
/// * `head` - Row-major initial coordinates of the new points, overwritten
/// * `tail` - Row-major coordinates of the reference points
/// * `params` - Layout parameters
///
/// ### Returns
///
/// `Ok(())` once all epochs are done
pub fn embed_against_reference<T>(
    graph: &mut CoordinateList<T>,
    head: &mut [T],
    tail: &[T],
    params: &LayoutParams<T>,
) -> Result<()>
where
    T: AtomicFloat,
{
    params.validate()?;
    let (n_head, n_tail) = graph.shape;
    check_shape(head, n_head, params.n_components)?;
    check_shape(tail, n_tail, params.n_components)?;

    let n_epochs = params.resolve_n_epochs(n_head);
    let mut schedule = prepare_schedule(graph, n_epochs, params.negative_sample_rate, params.verbose);

    let shared_head = AtomicEmbedding::from_slice(head, params.n_components)?;
    let shared_tail = AtomicEmbedding::from_slice(tail, params.n_components)?;
    let res = optimise_layout(&shared_head, &shared_tail, graph, &mut schedule, params, n_epochs);
    shared_head.write_to(head)?;
    res
}
