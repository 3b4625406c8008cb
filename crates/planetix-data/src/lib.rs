#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

//! Dataset plumbing for node-classification benchmarks.
//!
//! - [`FoldSet`] / [`SplitStore`] - stratified K-fold train/val/test splits,
//!   persisted as JSON next to the data
//! - [`LinqsProvider`] and [`SbmProvider`] - citation graphs from disk and
//!   synthetic block-model graphs
//! - [`collate`] / [`collate_dense`] - batch assembly
//! - [`PlanetoidDataset`] - ties the pieces together for a training loop
//!
//! # Example
//!
//! ```rust,no_run
//! use planetix_data::{DatasetConfig, LinqsProvider, PlanetoidDataset};
//!
//! let provider = LinqsProvider::new("data/planetoid");
//! let ds = PlanetoidDataset::load("data/planetoid", "Cora", &provider, &DatasetConfig::default())?;
//!
//! for fold in 0..ds.num_folds() {
//!     let train = ds.train_idx(fold)?;
//!     let val = ds.val_idx(fold)?;
//!     println!("fold {fold}: {} train / {} val", train.len(), val.len());
//! }
//! # Ok::<(), planetix_data::Error>(())
//! ```

pub mod collate;
mod config;
pub mod dataset;
pub mod embedding;
mod error;
pub mod provider;
pub mod sbm;
pub mod split;

pub use collate::{collate, collate_dense, dense_adjacency, sym_normalize_adj, BatchedGraph, DenseBatch};
pub use config::{DatasetConfig, SplitConfig};
pub use dataset::{format_dataset, GraphDataset, PlanetoidDataset};
pub use embedding::{embedding_path, load_embedding};
pub use error::{Error, Result};
pub use provider::{write_linqs, CitationGraph, DatasetProvider, LinqsProvider};
pub use sbm::{generate_sbm, SbmConfig, SbmProvider};
pub use split::{stratified_holdout, Fold, FoldSet, SplitStore, StratifiedKFold};
