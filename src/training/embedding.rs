//! Shared embedding buffer for lock-free parallel updates.
//!
//! Many edges share an endpoint, so the workers of one epoch write to the
//! same coordinates concurrently. Every coordinate lives in an atomic integer
//! holding the IEEE bit pattern, and additions go through a compare-and-swap
//! loop so no update is lost.

use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{LayoutError, Result};
use crate::training::gradients::squared_dist;

///////////////////
// Atomic floats //
///////////////////

/// Float types that can be stored in an [`AtomicEmbedding`]
pub trait AtomicFloat: Float + FromPrimitive + Send + Sync + Debug + 'static {
    /// Atomic storage cell of the same width
    type Atomic: Send + Sync;

    /// Wrap a value into a new atomic cell
    fn new_atomic(val: Self) -> Self::Atomic;

    /// Read the current value
    fn load(cell: &Self::Atomic) -> Self;

    /// Atomically add `val` to the cell
    fn fetch_add(cell: &Self::Atomic, val: Self);
}

macro_rules! impl_atomic_float {
    ($float:ty, $atomic:ty) => {
        impl AtomicFloat for $float {
            type Atomic = $atomic;

            #[inline(always)]
            fn new_atomic(val: Self) -> Self::Atomic {
                <$atomic>::new(val.to_bits())
            }

            #[inline(always)]
            fn load(cell: &Self::Atomic) -> Self {
                <$float>::from_bits(cell.load(Ordering::Relaxed))
            }

            #[inline(always)]
            fn fetch_add(cell: &Self::Atomic, val: Self) {
                // closure always returns Some, the update cannot fail
                let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                    Some((<$float>::from_bits(bits) + val).to_bits())
                });
            }
        }
    };
}

impl_atomic_float!(f32, AtomicU32);
impl_atomic_float!(f64, AtomicU64);

///////////////
// Embedding //
///////////////

/// Row-major embedding of `n_vertices x n_components` atomic coordinates
pub struct AtomicEmbedding<T: AtomicFloat> {
    data: Vec<T::Atomic>,
    n_vertices: usize,
    n_components: usize,
}

impl<T: AtomicFloat> AtomicEmbedding<T> {
    /// Copy a flat row-major buffer into atomic storage
    ///
    /// ### Params
    ///
    /// * `values` - Coordinates, `values.len()` must be a multiple of
    ///   `n_components`
    /// * `n_components` - Dimensionality of the embedding
    ///
    /// ### Returns
    ///
    /// The shared embedding or an error on a shape mismatch
    pub fn from_slice(values: &[T], n_components: usize) -> Result<Self> {
        if n_components == 0 {
            return Err(LayoutError::InvalidParameter(
                "n_components must be larger than 0".into(),
            ));
        }
        if values.len() % n_components != 0 {
            return Err(LayoutError::EmbeddingShape {
                expected: (values.len() / n_components + 1) * n_components,
                got: values.len(),
            });
        }

        Ok(Self {
            data: values.iter().map(|&v| T::new_atomic(v)).collect(),
            n_vertices: values.len() / n_components,
            n_components,
        })
    }

    /// Number of points
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    /// Dimensionality
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Coordinate `d` of vertex `i`
    #[inline(always)]
    pub fn get(&self, i: usize, d: usize) -> T {
        T::load(&self.data[i * self.n_components + d])
    }

    /// Atomically add `val` to coordinate `d` of vertex `i`
    #[inline(always)]
    pub fn add(&self, i: usize, d: usize, val: T) {
        T::fetch_add(&self.data[i * self.n_components + d], val);
    }

    /// Squared distance between vertex `i` of `self` and vertex `j` of
    /// `other`
    ///
    /// Reads every coordinate once; concurrent writers may interleave.
    #[inline(always)]
    pub fn squared_dist(&self, i: usize, other: &Self, j: usize) -> T {
        squared_dist(
            (0..self.n_components).map(|d| self.get(i, d)),
            (0..self.n_components).map(|d| other.get(j, d)),
        )
    }

    /// Copy of the current coordinates as a flat row-major vector
    pub fn snapshot(&self) -> Vec<T> {
        self.data.iter().map(T::load).collect()
    }

    /// Write the current coordinates back into a caller buffer
    ///
    /// ### Params
    ///
    /// * `out` - Destination of the same length as the embedding
    pub fn write_to(&self, out: &mut [T]) -> Result<()> {
        if out.len() != self.data.len() {
            return Err(LayoutError::EmbeddingShape {
                expected: self.data.len(),
                got: out.len(),
            });
        }
        for (o, cell) in out.iter_mut().zip(&self.data) {
            *o = T::load(cell);
        }
        Ok(())
    }
}

impl<T: AtomicFloat> Debug for AtomicEmbedding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicEmbedding")
            .field("n_vertices", &self.n_vertices)
            .field("n_components", &self.n_components)
            .finish()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_embedding {
    use super::*;
    use approx::assert_relative_eq;
    use rayon::prelude::*;

    #[test]
    fn test_from_slice_shape() {
        let embd = AtomicEmbedding::from_slice(&[0.0_f64, 1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();

        assert_eq!(embd.n_vertices(), 3);
        assert_eq!(embd.n_components(), 2);
        assert_eq!(embd.get(2, 1), 5.0);
        assert_eq!(embd.snapshot(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_from_slice_rejects_bad_shape() {
        assert!(AtomicEmbedding::from_slice(&[0.0_f32; 5], 2).is_err());
        assert!(AtomicEmbedding::from_slice(&[0.0_f32; 4], 0).is_err());
    }

    #[test]
    fn test_squared_dist_between_rows() {
        let embd = AtomicEmbedding::from_slice(&[0.0_f32, 0.0, 3.0, 4.0], 2).unwrap();
        assert_relative_eq!(embd.squared_dist(0, &embd, 1), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_write_to() {
        let embd = AtomicEmbedding::from_slice(&[1.0_f64, 2.0], 1).unwrap();
        embd.add(1, 0, 0.5);

        let mut out = vec![0.0; 2];
        embd.write_to(&mut out).unwrap();
        assert_eq!(out, vec![1.0, 2.5]);

        let mut wrong = vec![0.0; 3];
        assert!(embd.write_to(&mut wrong).is_err());
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let embd = AtomicEmbedding::from_slice(&[0.0_f64; 2], 2).unwrap();

        (0..10_000).into_par_iter().for_each(|_| {
            embd.add(0, 0, 1.0);
            embd.add(0, 1, -0.5);
        });

        assert_eq!(embd.get(0, 0), 10_000.0);
        assert_eq!(embd.get(0, 1), -5_000.0);
    }

    #[test]
    fn test_concurrent_adds_f32() {
        let embd = AtomicEmbedding::from_slice(&[0.0_f32], 1).unwrap();

        (0..4_096).into_par_iter().for_each(|_| embd.add(0, 0, 0.25));

        assert_eq!(embd.get(0, 0), 1024.0);
    }
}
