//! Stochastic block model graphs.
//!
//! Nodes are laid out community by community. Each unordered pair is joined
//! with probability `p_in` inside a community and `p_out` across. Node
//! features are single categorical values drawn uniformly from
//! `0..num_feature_values`, independent of the community, so a model can only
//! recover the labels from structure.

use crate::provider::{CitationGraph, DatasetProvider};
use crate::{Error, Result};
use ndarray::Array2;
use planetix_core::{Graph, NodeFeatures};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// SBM parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SbmConfig {
    /// Nodes per community; the community index is the label.
    pub community_sizes: Vec<usize>,
    pub p_in: f64,
    pub p_out: f64,
    pub num_feature_values: usize,
    pub seed: u64,
}

impl Default for SbmConfig {
    fn default() -> Self {
        Self {
            community_sizes: vec![50; 4],
            p_in: 0.3,
            p_out: 0.02,
            num_feature_values: 3,
            seed: 42,
        }
    }
}

impl SbmConfig {
    pub fn with_community_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.community_sizes = sizes;
        self
    }

    pub fn with_probabilities(mut self, p_in: f64, p_out: f64) -> Self {
        self.p_in = p_in;
        self.p_out = p_out;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.community_sizes.is_empty() || self.community_sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "SBM needs at least one non-empty community".into(),
            ));
        }
        for (what, p) in [("p_in", self.p_in), ("p_out", self.p_out)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidConfig(format!("{what} must lie in [0, 1], got {p}")));
            }
        }
        if self.num_feature_values == 0 {
            return Err(Error::InvalidConfig(
                "num_feature_values must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Sample an SBM graph. Undirected: every edge is stored in both directions.
pub fn generate_sbm(name: &str, config: &SbmConfig) -> Result<CitationGraph> {
    config.validate()?;
    let mut rng = XorShiftRng::seed_from_u64(config.seed);

    let labels: Vec<i64> = config
        .community_sizes
        .iter()
        .enumerate()
        .flat_map(|(c, &size)| std::iter::repeat(c as i64).take(size))
        .collect();
    let n = labels.len();

    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let p = if labels[i] == labels[j] {
                config.p_in
            } else {
                config.p_out
            };
            if rng.gen_bool(p) {
                edges.push((i, j));
                edges.push((j, i));
            }
        }
    }

    let upper = i64::try_from(config.num_feature_values)
        .map_err(|_| Error::InvalidConfig("num_feature_values too large".into()))?;
    let features = Array2::from_shape_fn((n, 1), |_| rng.gen_range(0..upper));
    let graph = Graph::new(n, edges, NodeFeatures::Categorical(features))?;

    info!(
        dataset = name,
        nodes = n,
        edges = graph.num_edges(),
        communities = config.community_sizes.len(),
        "generated SBM graph"
    );

    Ok(CitationGraph {
        name: name.to_string(),
        graph,
        labels,
        num_classes: config.community_sizes.len(),
        class_names: (0..config.community_sizes.len())
            .map(|c| format!("community_{c}"))
            .collect(),
        node_ids: (0..n).map(|i| format!("n{i}")).collect(),
    })
}

/// Provider that samples a fresh SBM graph for any name.
#[derive(Debug, Clone, Default)]
pub struct SbmProvider {
    pub config: SbmConfig,
}

impl SbmProvider {
    pub fn new(config: SbmConfig) -> Self {
        Self { config }
    }
}

impl DatasetProvider for SbmProvider {
    fn load(&self, name: &str) -> Result<CitationGraph> {
        generate_sbm(name, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_labels() {
        let config = SbmConfig::default().with_community_sizes(vec![10, 20, 30]);
        let data = generate_sbm("SBM", &config).unwrap();
        assert_eq!(data.graph.num_nodes(), 60);
        assert_eq!(data.num_classes, 3);
        assert_eq!(data.class_histogram(), vec![10, 20, 30]);
        assert!(data.graph.is_symmetric());
        assert_eq!(data.graph.num_self_loops(), 0);

        let x = data.graph.node_features().as_categorical().unwrap();
        assert_eq!(x.dim(), (60, 1));
        assert!(x.iter().all(|&v| (0..3).contains(&v)));
    }

    #[test]
    fn test_seeded() {
        let config = SbmConfig::default();
        let a = generate_sbm("a", &config).unwrap();
        let b = generate_sbm("b", &config).unwrap();
        assert_eq!(a.graph, b.graph);
    }

    #[test]
    fn test_extreme_probabilities() {
        // complete inside, nothing across
        let config = SbmConfig::default()
            .with_community_sizes(vec![4, 3])
            .with_probabilities(1.0, 0.0);
        let data = generate_sbm("x", &config).unwrap();
        assert_eq!(data.graph.num_edges(), 2 * (6 + 3));
        assert!(data.graph.edges().all(|(s, d)| data.labels[s] == data.labels[d]));
    }

    #[test]
    fn test_invalid_config() {
        assert!(SbmConfig::default().with_probabilities(1.5, 0.0).validate().is_err());
        assert!(SbmConfig::default().with_community_sizes(vec![]).validate().is_err());
        assert!(SbmConfig::default().with_community_sizes(vec![3, 0]).validate().is_err());
    }
}
