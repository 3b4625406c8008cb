//! Symmetric-normalized graph Laplacians.
//!
//! ```text
//! L = I - D^{-1/2} A D^{-1/2}
//! ```
//!
//! `D` holds in-degrees clipped to at least 1, so isolated nodes contribute
//! a plain `1` on the diagonal instead of a division by zero.
//!
//! The construction is written once against [`AdjacencyView`]; graph
//! representations plug in through small adapters ([`Graph`], [`CsrMatrix`],
//! [`DenseAdjacency`]).

use crate::sparse::CsrMatrix;
use crate::{Error, Graph, Result};
use ndarray::ArrayView2;

/// Anything that exposes a weighted adjacency structure.
pub trait AdjacencyView {
    /// Number of nodes (rows/columns of A).
    fn num_nodes(&self) -> usize;

    /// Every nonzero `A[src][dst]` as `(src, dst, weight)`. Repeated pairs add up.
    fn weighted_edges(&self) -> Box<dyn Iterator<Item = (usize, usize, f64)> + '_>;

    /// Column sums of A.
    fn in_degrees(&self) -> Vec<f64> {
        let mut deg = vec![0.0; self.num_nodes()];
        for (_, d, w) in self.weighted_edges() {
            deg[d] += w;
        }
        deg
    }
}

impl AdjacencyView for Graph {
    fn num_nodes(&self) -> usize {
        Graph::num_nodes(self)
    }

    fn weighted_edges(&self) -> Box<dyn Iterator<Item = (usize, usize, f64)> + '_> {
        Box::new(self.edges().map(|(s, d)| (s, d, 1.0)))
    }

    fn in_degrees(&self) -> Vec<f64> {
        Graph::in_degrees(self).into_iter().map(|d| d as f64).collect()
    }
}

impl AdjacencyView for CsrMatrix {
    fn num_nodes(&self) -> usize {
        self.shape().0
    }

    fn weighted_edges(&self) -> Box<dyn Iterator<Item = (usize, usize, f64)> + '_> {
        Box::new(self.triplets().filter(|&(_, _, w)| w != 0.0))
    }
}

/// Dense adjacency matrix adapter.
#[derive(Debug, Clone, Copy)]
pub struct DenseAdjacency<'a> {
    matrix: ArrayView2<'a, f64>,
}

impl<'a> DenseAdjacency<'a> {
    /// Wrap a square matrix.
    pub fn new(matrix: ArrayView2<'a, f64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(Error::DimensionMismatch {
                what: "adjacency columns",
                expected: rows,
                got: cols,
            });
        }
        Ok(Self { matrix })
    }
}

impl AdjacencyView for DenseAdjacency<'_> {
    fn num_nodes(&self) -> usize {
        self.matrix.nrows()
    }

    fn weighted_edges(&self) -> Box<dyn Iterator<Item = (usize, usize, f64)> + '_> {
        Box::new(
            self.matrix
                .indexed_iter()
                .filter(|(_, &w)| w != 0.0)
                .map(|((s, d), &w)| (s, d, w)),
        )
    }
}

/// Build `L = I - D^{-1/2} A D^{-1/2}` for any adjacency source.
pub fn normalized_laplacian<A: AdjacencyView + ?Sized>(adjacency: &A) -> CsrMatrix {
    let n = adjacency.num_nodes();
    let inv_sqrt: Vec<f64> = adjacency
        .in_degrees()
        .into_iter()
        .map(|d| d.max(1.0).powf(-0.5))
        .collect();

    let off_diagonal = adjacency
        .weighted_edges()
        .map(|(s, d, w)| (s, d, -w * inv_sqrt[s] * inv_sqrt[d]));
    let diagonal = (0..n).map(|i| (i, i, 1.0));

    CsrMatrix::from_triplets(n, n, diagonal.chain(off_diagonal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeFeatures;
    use ndarray::{array, Array2};

    fn path3() -> Graph {
        Graph::new(
            3,
            vec![(0, 1), (1, 0), (1, 2), (2, 1)],
            NodeFeatures::Dense(Array2::zeros((3, 1))),
        )
        .unwrap()
    }

    #[test]
    fn test_path_laplacian_entries() {
        let l = normalized_laplacian(&path3());
        let expected = -1.0 / 2f64.sqrt();
        assert!((l.get(0, 0) - 1.0).abs() < 1e-12);
        assert!((l.get(0, 1) - expected).abs() < 1e-12);
        assert!((l.get(1, 2) - expected).abs() < 1e-12);
        assert_eq!(l.get(0, 2), 0.0);
        assert!(l.is_symmetric(1e-12));
    }

    #[test]
    fn test_isolated_node_keeps_unit_diagonal() {
        let g = Graph::new(3, vec![(0, 1), (1, 0)], NodeFeatures::Dense(Array2::zeros((3, 1))))
            .unwrap();
        let l = normalized_laplacian(&g);
        assert_eq!(l.get(2, 2), 1.0);
        assert_eq!(l.row(2).count(), 1);
    }

    #[test]
    fn test_adapters_agree() {
        let dense = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let from_dense = normalized_laplacian(&DenseAdjacency::new(dense.view()).unwrap());
        let from_graph = normalized_laplacian(&path3());
        assert_eq!(from_dense.to_dense(), from_graph.to_dense());
    }

    #[test]
    fn test_dense_adapter_rejects_non_square() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(DenseAdjacency::new(m.view()).is_err());
    }
}
