//! Dataset and split configuration.
//!
//! Every struct derives serde with `#[serde(default)]`, so a JSON file only
//! needs to name the fields it overrides.

use crate::{Error, Result};
use planetix_core::EigenConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stratified fold generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Number of folds K.
    pub n_splits: usize,
    /// Share of each fold's non-test indices held out for validation.
    pub val_fraction: f64,
    /// Shuffle seed. `None` draws from OS entropy, so the file is not
    /// reproducible.
    pub seed: Option<u64>,
    /// Regenerate even when a matching split file exists.
    pub force_recompute: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            n_splits: 10,
            val_fraction: 0.111,
            seed: Some(42),
            force_recompute: false,
        }
    }
}

impl SplitConfig {
    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    pub fn with_val_fraction(mut self, val_fraction: f64) -> Self {
        self.val_fraction = val_fraction;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_force_recompute(mut self, force: bool) -> Self {
        self.force_recompute = force;
        self
    }

    /// Reject parameter combinations no split can satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.n_splits < 2 {
            return Err(Error::InvalidConfig(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if !(self.val_fraction > 0.0 && self.val_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "val_fraction must lie in (0, 1), got {}",
                self.val_fraction
            )));
        }
        Ok(())
    }
}

/// Everything [`PlanetoidDataset`](crate::PlanetoidDataset) needs besides the
/// dataset name and provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub split: SplitConfig,
    /// Attach a Laplacian positional encoding of this width at load time.
    pub pos_enc_dim: Option<usize>,
    pub eigen: EigenConfig,
    /// Concatenate `<root>/embedding_<name>.safetensors` to the node features.
    pub use_embedding: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            pos_enc_dim: None,
            eigen: EigenConfig::default(),
            use_embedding: false,
        }
    }
}

impl DatasetConfig {
    /// Load a config from JSON. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_pos_enc_dim(mut self, dim: usize) -> Self {
        self.pos_enc_dim = Some(dim);
        self
    }

    pub fn with_eigen(mut self, eigen: EigenConfig) -> Self {
        self.eigen = eigen;
        self
    }

    pub fn with_embedding(mut self, use_embedding: bool) -> Self {
        self.use_embedding = use_embedding;
        self
    }
}
