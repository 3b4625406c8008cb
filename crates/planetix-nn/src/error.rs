//! Error types for planetix-nn.

use thiserror::Error;

/// Model construction and loss errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Graph-level error.
    #[error(transparent)]
    Core(#[from] planetix_core::Error),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Label values outside `0..n_classes` or a degenerate label set.
    #[error("invalid labels: {0}")]
    Labels(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
