//! Laplacian positional encodings.
//!
//! Each node gets the components of the `k` lowest-frequency non-trivial
//! eigenvectors of the normalized Laplacian. The trivial eigenvector (the
//! smallest eigenvalue, 0 for a connected graph) is dropped.
//!
//! A graph with `c` components has `c` zero eigenvalues. Only the first is
//! dropped; the others stay as columns supported on a single component each.

use crate::eigen::{smallest_eigenpairs, EigenConfig};
use crate::laplacian::{normalized_laplacian, AdjacencyView};
use crate::sparse::CsrMatrix;
use crate::{Error, Graph, Result};
use ndarray::{s, Array2};
use tracing::{debug, warn};

const SYMMETRY_TOL: f64 = 1e-12;

/// Computes `dim`-wide Laplacian positional encodings.
#[derive(Debug, Clone)]
pub struct LaplacianPositionalEncoder {
    dim: usize,
    eigen: EigenConfig,
}

impl LaplacianPositionalEncoder {
    /// Encoder producing `dim` columns, with the default solver settings.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            eigen: EigenConfig::default(),
        }
    }

    pub fn with_eigen_config(mut self, eigen: EigenConfig) -> Self {
        self.eigen = eigen;
        self
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Encode any adjacency source.
    ///
    /// Agrees exactly with [`encode_from_laplacian`](Self::encode_from_laplacian)
    /// on the Laplacian built by [`normalized_laplacian`].
    pub fn encode<A: AdjacencyView + ?Sized>(&self, adjacency: &A) -> Result<Array2<f32>> {
        self.encode_from_laplacian(&normalized_laplacian(adjacency))
    }

    /// Encode from a precomputed normalized Laplacian.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `dim` is zero, [`Error::Convergence`] when
    /// the graph has `dim` nodes or fewer or the solver does not converge.
    pub fn encode_from_laplacian(&self, laplacian: &CsrMatrix) -> Result<Array2<f32>> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig(
                "positional encoding dimension must be positive".into(),
            ));
        }
        let (n, _) = laplacian.shape();
        if n <= self.dim {
            return Err(Error::Convergence {
                requested: self.dim + 1,
                num_nodes: n,
                detail: "graph too small for the requested encoding dimension".into(),
            });
        }

        let symmetrized;
        let laplacian = if laplacian.is_symmetric(SYMMETRY_TOL) {
            laplacian
        } else {
            warn!(num_nodes = n, "laplacian is not symmetric, using (L + L^T) / 2");
            symmetrized = laplacian.symmetrized();
            &symmetrized
        };

        let pairs = smallest_eigenpairs(laplacian, self.dim + 1, &self.eigen)?;
        debug!(
            num_nodes = n,
            dim = self.dim,
            basis = pairs.basis_size,
            residual = pairs.max_residual,
            "positional encoding computed"
        );

        Ok(pairs.vectors.slice(s![.., 1..]).mapv(|v| v as f32))
    }

    /// Return a copy of `graph` carrying its positional encoding.
    pub fn attach(&self, graph: &Graph) -> Result<Graph> {
        let pe = self.encode(graph)?;
        graph.clone().with_pos_enc(pe)
    }
}

/// Encode a graph with the default solver settings.
pub fn positional_encoding(graph: &Graph, dim: usize) -> Result<Array2<f32>> {
    LaplacianPositionalEncoder::new(dim).encode(graph)
}
