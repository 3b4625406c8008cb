//! Error types for planetix-core.

use thiserror::Error;

/// Errors raised while building, transforming or encoding graphs.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural problem with a graph record (edge endpoint out of range, ...).
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A feature matrix has the wrong number of rows or columns.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The eigensolver could not produce the requested eigenpairs.
    ///
    /// Raised both for graphs that are too small for the requested encoding
    /// dimension and for runs whose residuals stay above tolerance.
    #[error("eigensolver did not converge ({requested} eigenpairs, {num_nodes} nodes): {detail}")]
    Convergence {
        requested: usize,
        num_nodes: usize,
        detail: String,
    },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
