use thiserror::Error;

/// Errors returned by the layout optimiser.
///
/// Numerical degeneracies (points sitting on top of each other) are handled
/// inside the optimiser and never surface here.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The worker pool for the parallel epochs could not be built.
    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A worker failed while an epoch was in flight. The embedding is left
    /// partially updated.
    #[error("parallel dispatch failed in epoch {epoch}: {message}")]
    DispatchFailed { epoch: usize, message: String },

    /// Parallel arrays that must have the same length do not.
    #[error("vectors have different lengths: {lengths:?}")]
    LengthMismatch { lengths: Vec<usize> },

    /// An edge points at a vertex that does not exist.
    #[error("vertex index {index} out of bounds for {n_vertices} vertices")]
    VertexOutOfBounds { index: usize, n_vertices: usize },

    /// Edge weights must be finite and non-negative.
    #[error("invalid edge weight at position {index}: {value}")]
    InvalidWeight { index: usize, value: f64 },

    /// The embedding buffer does not match `n_vertices x n_components`.
    #[error("embedding has {got} values, expected {expected}")]
    EmbeddingShape { expected: usize, got: usize },

    /// A layout parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayoutError>;
