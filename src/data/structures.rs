use num_traits::Float;

use crate::ensure_same_len;
use crate::error::{LayoutError, Result};

/////////////////////
// Data structures //
/////////////////////

/////////
// COO //
/////////

/// Coordinate list
///
/// Represents the weighted 1-skeleton in COO (Coordinate) format. Rows index
/// the embedding being optimised (head), columns index the embedding it is
/// optimised against (tail). For a normal fit both are the same set of
/// vertices and the shape is square.
///
/// ### Fields
///
/// * `row_indices` - Row index (source vertex) of every edge
/// * `col_indices` - Column index (destination vertex) of every edge
/// * `values` - Edge weights (membership strengths)
/// * `shape` - `(n_head_vertices, n_tail_vertices)`
#[derive(Clone, Debug)]
pub struct CoordinateList<T> {
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<T>,
    pub shape: (usize, usize),
}

impl<T> CoordinateList<T>
where
    T: Float,
{
    /// Generate a new square graph over `n_samples` vertices
    ///
    /// ### Params
    ///
    /// * `row_indices` - Source vertex per edge
    /// * `col_indices` - Destination vertex per edge
    /// * `values` - Weight per edge
    /// * `n_samples` - Number of vertices in the graph
    ///
    /// ### Returns
    ///
    /// The validated graph or an error if the arrays disagree in length, an
    /// index is out of bounds or a weight is negative/non-finite.
    pub fn new(
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
        n_samples: usize,
    ) -> Result<Self> {
        Self::with_shape(row_indices, col_indices, values, (n_samples, n_samples))
    }

    /// Generate a new (possibly rectangular) graph
    ///
    /// ### Params
    ///
    /// * `row_indices` - Source vertex per edge, indexing the head embedding
    /// * `col_indices` - Destination vertex per edge, indexing the tail
    ///   embedding
    /// * `values` - Weight per edge
    /// * `shape` - `(n_head_vertices, n_tail_vertices)`
    ///
    /// ### Returns
    ///
    /// The validated graph
    pub fn with_shape(
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
        shape: (usize, usize),
    ) -> Result<Self> {
        ensure_same_len!(row_indices, col_indices, values);

        for &r in &row_indices {
            if r >= shape.0 {
                return Err(LayoutError::VertexOutOfBounds {
                    index: r,
                    n_vertices: shape.0,
                });
            }
        }
        for &c in &col_indices {
            if c >= shape.1 {
                return Err(LayoutError::VertexOutOfBounds {
                    index: c,
                    n_vertices: shape.1,
                });
            }
        }
        for (index, &w) in values.iter().enumerate() {
            if !w.is_finite() || w < T::zero() {
                return Err(LayoutError::InvalidWeight {
                    index,
                    value: w.to_f64().unwrap_or(f64::NAN),
                });
            }
        }

        Ok(Self {
            row_indices,
            col_indices,
            values,
            shape,
        })
    }

    /// Generate an edge list from the COO
    ///
    /// ### Returns
    ///
    /// A vector of tuples representing the edges and their weights
    pub fn to_edge_list(&self) -> Vec<(usize, usize, T)> {
        self.row_indices
            .iter()
            .zip(&self.col_indices)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
            .collect()
    }

    /// Returns the number of stored edges
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the number of head vertices
    pub fn n_samples(&self) -> usize {
        self.shape.0
    }

    /// Largest edge weight, `0` for an empty graph
    pub fn max_weight(&self) -> T {
        self.values
            .iter()
            .copied()
            .fold(T::zero(), |acc, w| if w > acc { w } else { acc })
    }

    /// Drop every edge whose weight is exactly zero
    ///
    /// Keeps the relative order of the surviving edges.
    ///
    /// ### Returns
    ///
    /// The number of edges removed
    pub fn remove_zeros(&mut self) -> usize {
        let before = self.nnz();
        let mut keep = 0;

        for idx in 0..before {
            if self.values[idx] != T::zero() {
                self.row_indices[keep] = self.row_indices[idx];
                self.col_indices[keep] = self.col_indices[idx];
                self.values[keep] = self.values[idx];
                keep += 1;
            }
        }

        self.row_indices.truncate(keep);
        self.col_indices.truncate(keep);
        self.values.truncate(keep);

        before - keep
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_structures {
    use super::*;

    #[test]
    fn test_coo_new_valid() {
        let graph = CoordinateList::new(vec![0, 1], vec![1, 2], vec![0.5_f64, 1.0], 3).unwrap();

        assert_eq!(graph.nnz(), 2);
        assert_eq!(graph.n_samples(), 3);
        assert_eq!(graph.max_weight(), 1.0);
        assert_eq!(graph.to_edge_list(), vec![(0, 1, 0.5), (1, 2, 1.0)]);
    }

    #[test]
    fn test_coo_length_mismatch() {
        let res = CoordinateList::new(vec![0, 1], vec![1], vec![0.5_f64, 1.0], 3);

        match res {
            Err(LayoutError::LengthMismatch { lengths }) => assert_eq!(lengths, vec![2, 1, 2]),
            other => panic!("expected length mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_coo_out_of_bounds() {
        let res = CoordinateList::new(vec![0], vec![3], vec![1.0_f64], 3);
        assert!(matches!(
            res,
            Err(LayoutError::VertexOutOfBounds {
                index: 3,
                n_vertices: 3
            })
        ));
    }

    #[test]
    fn test_coo_rectangular_bounds() {
        // columns index a larger reference set
        let graph = CoordinateList::with_shape(vec![0, 1], vec![7, 9], vec![1.0_f32, 1.0], (2, 10));
        assert!(graph.is_ok());

        let bad = CoordinateList::with_shape(vec![2], vec![0], vec![1.0_f32], (2, 10));
        assert!(bad.is_err());
    }

    #[test]
    fn test_coo_rejects_negative_and_nan() {
        let neg = CoordinateList::new(vec![0], vec![1], vec![-0.1_f64], 2);
        assert!(matches!(neg, Err(LayoutError::InvalidWeight { index: 0, .. })));

        let nan = CoordinateList::new(vec![0, 1], vec![1, 0], vec![1.0, f64::NAN], 2);
        assert!(matches!(nan, Err(LayoutError::InvalidWeight { index: 1, .. })));
    }

    #[test]
    fn test_remove_zeros_compacts_in_order() {
        let mut graph = CoordinateList::new(
            vec![0, 1, 2, 3],
            vec![1, 2, 3, 0],
            vec![1.0_f64, 0.0, 0.25, 0.0],
            4,
        )
        .unwrap();

        let removed = graph.remove_zeros();

        assert_eq!(removed, 2);
        assert_eq!(graph.row_indices, vec![0, 2]);
        assert_eq!(graph.col_indices, vec![1, 3]);
        assert_eq!(graph.values, vec![1.0, 0.25]);
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = CoordinateList::<f64>::new(vec![], vec![], vec![], 5).unwrap();

        assert_eq!(graph.nnz(), 0);
        assert_eq!(graph.max_weight(), 0.0);
        assert_eq!(graph.remove_zeros(), 0);
    }
}
