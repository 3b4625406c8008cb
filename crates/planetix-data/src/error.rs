//! Error types for planetix-data.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while splitting, loading or collating datasets.
#[derive(Error, Debug)]
pub enum Error {
    /// Graph-level failure (invalid record, eigensolver, ...).
    #[error(transparent)]
    Core(#[from] planetix_core::Error),

    /// A class has fewer members than there are folds.
    #[error("class {label} has {count} members, fewer than n_splits = {n_splits}")]
    InsufficientClassMembers {
        label: i64,
        count: usize,
        n_splits: usize,
    },

    /// Invalid split or dataset parameters.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A file the dataset needs does not exist.
    #[error("missing resource: {}", path.display())]
    MissingResource { path: PathBuf },

    /// Malformed dataset file.
    #[error("{}:{line}: {msg}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    /// Fold index outside `0..num_folds`.
    #[error("fold {fold} out of range (dataset has {num_folds} folds)")]
    FoldOutOfRange { fold: usize, num_folds: usize },

    /// Collation called with no samples.
    #[error("cannot collate an empty batch")]
    EmptyBatch,

    /// Paired lists of different length.
    #[error("{what}: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Samples in one batch disagree on their feature layout.
    #[error("incompatible batch: {0}")]
    IncompatibleBatch(String),

    /// Tensor file error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, Error>;
