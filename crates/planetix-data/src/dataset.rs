//! Datasets exposed to training loops.

use crate::collate::{collate, collate_dense, BatchedGraph, DenseBatch};
use crate::config::DatasetConfig;
use crate::embedding::{concat_features, embedding_path, load_embedding};
use crate::provider::{CitationGraph, DatasetProvider};
use crate::split::{Fold, FoldSet, SplitStore};
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use planetix_core::transform;
use planetix_core::{EdgeFeatures, Graph, LaplacianPositionalEncoder, NodeFeatures};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Graphs paired with their targets.
///
/// A node-level task stores one label per node (length N); a graph-level task
/// stores a length-1 array.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDataset {
    graphs: Vec<Graph>,
    labels: Vec<Array1<i64>>,
}

impl GraphDataset {
    /// Pair up graphs and labels. Both lists must have the same length.
    pub fn new(graphs: Vec<Graph>, labels: Vec<Array1<i64>>) -> Result<Self> {
        if graphs.len() != labels.len() {
            return Err(Error::LengthMismatch {
                what: "graphs and labels",
                left: graphs.len(),
                right: labels.len(),
            });
        }
        Ok(Self { graphs, labels })
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<(&Graph, &Array1<i64>)> {
        Some((self.graphs.get(i)?, self.labels.get(i)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Graph, &Array1<i64>)> {
        self.graphs.iter().zip(self.labels.iter())
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    pub fn labels(&self) -> &[Array1<i64>] {
        &self.labels
    }

    /// Normalized copy: float node features, edge features always present.
    pub fn format(&self) -> Self {
        Self {
            graphs: self.graphs.par_iter().map(transform::normalize).collect(),
            labels: self.labels.clone(),
        }
    }

    /// Replace every graph with its self-looped version.
    pub fn add_self_loops(&mut self) {
        self.graphs = self.graphs.par_iter().map(transform::add_self_loops).collect();
    }
}

/// Apply the graph normalizer to every sample of `dataset`.
pub fn format_dataset(dataset: &GraphDataset) -> GraphDataset {
    dataset.format()
}

/// A single-graph citation dataset with persisted stratified folds.
///
/// Construction loads the graph through a provider, optionally appends an
/// external node embedding, loads or generates the fold file under `root`,
/// and attaches default edge features (ones, width 1) when the graph has
/// none.
#[derive(Debug, Clone)]
pub struct PlanetoidDataset {
    name: String,
    num_classes: usize,
    class_names: Vec<String>,
    dataset: GraphDataset,
    folds: FoldSet,
}

impl PlanetoidDataset {
    pub fn load<P>(root: impl AsRef<Path>, name: &str, provider: &P, config: &DatasetConfig) -> Result<Self>
    where
        P: DatasetProvider + ?Sized,
    {
        let data = provider.load(name)?;
        Self::from_citation_graph(root, data, config)
    }

    pub fn from_citation_graph(
        root: impl AsRef<Path>,
        data: CitationGraph,
        config: &DatasetConfig,
    ) -> Result<Self> {
        let start = Instant::now();
        let root = root.as_ref();
        let CitationGraph {
            name,
            mut graph,
            labels,
            num_classes,
            class_names,
            ..
        } = data;

        if labels.len() != graph.num_nodes() {
            return Err(Error::LengthMismatch {
                what: "labels and nodes",
                left: labels.len(),
                right: graph.num_nodes(),
            });
        }

        if config.use_embedding {
            let embedding = load_embedding(&embedding_path(root, &name))?;
            let x = concat_features(&graph.node_features().to_dense(), &embedding)?;
            graph.set_node_features(NodeFeatures::Dense(x))?;
        }

        let folds = SplitStore::new(root).load_or_generate(&name, &labels, &config.split)?;

        if !graph.edge_features().is_present() {
            let ones = Array2::ones((graph.num_edges(), 1));
            graph = graph.with_edge_features(EdgeFeatures::Present(ones))?;
        }

        if let Some(dim) = config.pos_enc_dim {
            graph = LaplacianPositionalEncoder::new(dim)
                .with_eigen_config(config.eigen.clone())
                .attach(&graph)?;
        }

        info!(
            dataset = %name,
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            classes = num_classes,
            folds = folds.num_folds(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dataset ready"
        );

        let dataset = GraphDataset::new(vec![graph], vec![Array1::from(labels)])?;
        Ok(Self {
            name,
            num_classes,
            class_names,
            dataset,
            folds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// The stored graph.
    pub fn graph(&self) -> &Graph {
        &self.dataset.graphs()[0]
    }

    /// Per-node labels.
    pub fn labels(&self) -> &Array1<i64> {
        &self.dataset.labels()[0]
    }

    /// The stored samples (one graph for citation datasets).
    pub fn dataset(&self) -> &GraphDataset {
        &self.dataset
    }

    pub fn folds(&self) -> &FoldSet {
        &self.folds
    }

    pub fn num_folds(&self) -> usize {
        self.folds.num_folds()
    }

    pub fn fold(&self, i: usize) -> Result<Fold<'_>> {
        self.folds.fold(i)
    }

    pub fn train_idx(&self, fold: usize) -> Result<&[usize]> {
        Ok(self.folds.fold(fold)?.train)
    }

    pub fn val_idx(&self, fold: usize) -> Result<&[usize]> {
        Ok(self.folds.fold(fold)?.val)
    }

    pub fn test_idx(&self, fold: usize) -> Result<&[usize]> {
        Ok(self.folds.fold(fold)?.test)
    }

    /// Sparse collation entry point.
    pub fn collate<'a, I>(&self, samples: I) -> Result<BatchedGraph>
    where
        I: IntoIterator<Item = (&'a Graph, &'a Array1<i64>)>,
    {
        collate(samples)
    }

    /// Dense collation entry point.
    pub fn collate_dense_gnn<'a, I>(&self, samples: I) -> Result<DenseBatch>
    where
        I: IntoIterator<Item = (&'a Graph, &'a Array1<i64>)>,
    {
        collate_dense(samples)
    }

    /// Normalize the stored samples in place.
    pub fn format(&mut self) {
        self.dataset = self.dataset.format();
    }

    /// Add self-loops to every stored sample.
    pub fn add_self_loops(&mut self) {
        self.dataset.add_self_loops();
    }
}
