//! Data preparation and GCN models for node-classification benchmarks.
//!
//! `planetix` bundles the pieces a GNN benchmark run needs before training:
//!
//! - Load a citation graph (LINQS format) or sample a block-model graph
//! - Generate stratified K-fold train/val/test splits and persist them
//! - Compute Laplacian positional encodings
//! - Collate graphs into sparse or dense batches
//! - GCN layers and networks on candle (feature `nn`)
//!
//! # Crate Structure
//!
//! - [`planetix_core`] - graph record, normalizer, Lanczos eigensolver,
//!   positional encoder, connected components
//! - [`planetix_data`] - splits, providers, collation, dataset facade
//! - `planetix_nn` - GCN layers, readout, weighted loss
//!
//! # Example
//!
//! ```rust
//! use planetix::{DatasetConfig, PlanetoidDataset, SbmConfig, SbmProvider};
//!
//! let dir = tempfile::tempdir()?;
//! let provider = SbmProvider::new(SbmConfig::default().with_community_sizes(vec![20, 20]));
//! let config = DatasetConfig::default().with_pos_enc_dim(2);
//! let ds = PlanetoidDataset::load(dir.path(), "SBM", &provider, &config)?;
//!
//! assert_eq!(ds.num_folds(), 10);
//! assert_eq!(ds.graph().pos_enc().map(|p| p.ncols()), Some(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use planetix_core;
pub use planetix_data;
#[cfg(feature = "nn")]
pub use planetix_nn as nn;

pub use planetix_core::{
    component_stats, connected_components, positional_encoding, EdgeFeatures, Graph,
    LaplacianPositionalEncoder, NodeFeatures,
};
pub use planetix_data::{
    collate, collate_dense, generate_sbm, format_dataset, DatasetConfig, DatasetProvider,
    FoldSet, GraphDataset, LinqsProvider, PlanetoidDataset, SbmConfig, SbmProvider, SplitConfig,
    SplitStore, StratifiedKFold,
};
