#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::uninlined_format_args)]

//! Graph records and preprocessing for GNN benchmarks.
//!
//! - [`Graph`] - edge list with node, edge and positional features
//! - [`transform`] - canonical form: float features, synthesized edge
//!   features, self-loops
//! - [`laplacian`] - normalized Laplacian over any [`AdjacencyView`]
//! - [`eigen`] - Lanczos solver for the smallest eigenpairs
//! - [`positional`] - Laplacian positional encodings
//! - [`components`] - connected components
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array2;
//! use planetix_core::{positional_encoding, transform, Graph, NodeFeatures};
//!
//! let edges = vec![(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2)];
//! let g = Graph::new(4, edges, NodeFeatures::Dense(Array2::ones((4, 8)))).unwrap();
//!
//! let g = transform::normalize(&g);
//! assert_eq!(g.edge_features().width(), Some(8));
//!
//! let pe = positional_encoding(&g, 2).unwrap();
//! assert_eq!(pe.dim(), (4, 2));
//! ```

pub mod components;
pub mod eigen;
mod error;
mod graph;
pub mod laplacian;
pub mod positional;
pub mod sparse;
pub mod transform;

pub use components::{component_stats, connected_components, ComponentStats};
pub use eigen::{smallest_eigenpairs, EigenConfig, EigenPairs};
pub use error::{Error, Result};
pub use graph::{EdgeFeatures, Graph, GraphStats, NodeFeatures};
pub use laplacian::{normalized_laplacian, AdjacencyView, DenseAdjacency};
pub use positional::{positional_encoding, LaplacianPositionalEncoder};
pub use sparse::CsrMatrix;

