use num_traits::Float;
use thousands::*;

use crate::data::structures::*;

/// Filter out edges that are too weak to be sampled during optimisation
///
/// Every weight below `max_weight / n_epochs` is set to zero and the graph is
/// compacted afterwards, so the number of stored edges shrinks. Such edges
/// would fire less than once over the whole run.
///
/// ### Params
///
/// * `graph` - Input graph in COO format, modified in place
/// * `n_epochs` - Total epoch budget (must be larger than 0)
/// * `verbose` - Controls verbosity
///
/// ### Returns
///
/// The number of edges that were removed
pub fn threshold_weak_edges<T>(graph: &mut CoordinateList<T>, n_epochs: usize, verbose: bool) -> usize
where
    T: Float,
{
    let max_weight = graph.max_weight();
    let threshold = max_weight / T::from(n_epochs.max(1)).unwrap_or_else(T::one);

    for w in graph.values.iter_mut() {
        if *w < threshold {
            *w = T::zero();
        }
    }

    let removed = graph.remove_zeros();

    if verbose {
        tracing::info!(
            removed = %removed.separate_with_underscores(),
            remaining = %graph.nnz().separate_with_underscores(),
            "filtered out weak edges"
        );
    } else {
        tracing::debug!(removed, remaining = graph.nnz(), "filtered out weak edges");
    }

    removed
}

///////////
// Tests //
///////////
