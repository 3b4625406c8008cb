//! Batch collation.
//!
//! Two layouts:
//!
//! - [`collate`]: disjoint union of the sample graphs. Node ids are shifted by
//!   the running node count, features are stacked, and `node_graph[v]` tells
//!   which sample node `v` came from.
//! - [`collate_dense`]: a `(1 + d, N, N)` cube for dense models. Channel 0 is
//!   the normalized adjacency `D^{-1/2} A D^{-1/2}`; channel `1 + i` holds node
//!   feature `i` on its diagonal. Only the first sample is used.

use crate::{Error, Result};
use ndarray::{concatenate, Array1, Array2, Array3, ArrayView2, Axis};
use planetix_core::{EdgeFeatures, Graph, NodeFeatures};
use tracing::warn;

/// Several graphs merged into one, with no edges between them.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedGraph {
    pub graph: Graph,
    /// Sample index of every node.
    pub node_graph: Vec<usize>,
    pub batch_num_nodes: Vec<usize>,
    pub batch_num_edges: Vec<usize>,
    /// Labels of all samples, concatenated in input order.
    pub labels: Array1<i64>,
}

impl BatchedGraph {
    pub fn batch_size(&self) -> usize {
        self.batch_num_nodes.len()
    }
}

/// Dense single-graph batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBatch {
    /// `(1 + d, N, N)`
    pub tensor: Array3<f32>,
    /// Labels of the sample the tensor was built from.
    pub labels: Array1<i64>,
}

/// Merge samples into one disjoint-union graph.
///
/// All samples must agree on node-feature kind and width, and on presence
/// and width of edge features and positional encodings.
pub fn collate<'a, I>(samples: I) -> Result<BatchedGraph>
where
    I: IntoIterator<Item = (&'a Graph, &'a Array1<i64>)>,
{
    let samples: Vec<(&Graph, &Array1<i64>)> = samples.into_iter().collect();
    let (first, _) = samples.first().ok_or(Error::EmptyBatch)?;
    for (i, (g, _)) in samples.iter().enumerate().skip(1) {
        check_compatible(first, g, i)?;
    }

    let total_nodes: usize = samples.iter().map(|(g, _)| g.num_nodes()).sum();
    let total_edges: usize = samples.iter().map(|(g, _)| g.num_edges()).sum();
    let mut src = Vec::with_capacity(total_edges);
    let mut dst = Vec::with_capacity(total_edges);
    let mut node_graph = Vec::with_capacity(total_nodes);
    let mut batch_num_nodes = Vec::with_capacity(samples.len());
    let mut batch_num_edges = Vec::with_capacity(samples.len());

    let mut offset = 0;
    for (i, (g, _)) in samples.iter().enumerate() {
        src.extend(g.src().iter().map(|&s| s + offset));
        dst.extend(g.dst().iter().map(|&d| d + offset));
        node_graph.extend(std::iter::repeat(i).take(g.num_nodes()));
        batch_num_nodes.push(g.num_nodes());
        batch_num_edges.push(g.num_edges());
        offset += g.num_nodes();
    }

    let node_features = match first.node_features() {
        NodeFeatures::Categorical(_) => NodeFeatures::Categorical(stack(
            samples
                .iter()
                .filter_map(|(g, _)| g.node_features().as_categorical())
                .map(|x| x.view()),
        )?),
        NodeFeatures::Dense(_) => NodeFeatures::Dense(stack(
            samples
                .iter()
                .filter_map(|(g, _)| g.node_features().as_dense())
                .map(|x| x.view()),
        )?),
    };

    let edge_features = if first.edge_features().is_present() {
        EdgeFeatures::Present(stack(
            samples
                .iter()
                .filter_map(|(g, _)| g.edge_features().as_array())
                .map(|x| x.view()),
        )?)
    } else {
        EdgeFeatures::Absent
    };

    let mut graph = Graph::from_parts(total_nodes, src, dst, node_features, edge_features)?;
    if first.pos_enc().is_some() {
        let pe = stack(samples.iter().filter_map(|(g, _)| g.pos_enc()).map(|x| x.view()))?;
        graph.set_pos_enc(pe)?;
    }

    let label_views: Vec<_> = samples.iter().map(|(_, l)| l.view()).collect();
    let labels = concatenate(Axis(0), &label_views)
        .map_err(|e| Error::IncompatibleBatch(format!("labels: {e}")))?;

    Ok(BatchedGraph {
        graph,
        node_graph,
        batch_num_nodes,
        batch_num_edges,
        labels,
    })
}

fn check_compatible(first: &Graph, other: &Graph, index: usize) -> Result<()> {
    let mismatch = |what: &str| {
        Err(Error::IncompatibleBatch(format!(
            "sample {index} differs from sample 0 in {what}"
        )))
    };
    if first.node_features().is_dense() != other.node_features().is_dense() {
        return mismatch("node feature kind");
    }
    if first.node_features().width() != other.node_features().width() {
        return mismatch("node feature width");
    }
    if first.edge_features().width() != other.edge_features().width() {
        return mismatch("edge features");
    }
    if first.pos_enc().map(Array2::ncols) != other.pos_enc().map(Array2::ncols) {
        return mismatch("positional encoding");
    }
    Ok(())
}

fn stack<'a, T: Clone + 'a>(parts: impl Iterator<Item = ArrayView2<'a, T>>) -> Result<Array2<T>> {
    let parts: Vec<_> = parts.collect();
    concatenate(Axis(0), &parts).map_err(|e| Error::IncompatibleBatch(e.to_string()))
}

/// Raw adjacency counts, `A[src][dst]` incremented once per edge.
pub fn dense_adjacency(graph: &Graph) -> Array2<f32> {
    let n = graph.num_nodes();
    let mut adj = Array2::zeros((n, n));
    for (s, d) in graph.edges() {
        adj[[s, d]] += 1.0;
    }
    adj
}

/// `D^{-1/2} A D^{-1/2}` with `D` the column sums. Zero-degree factors are 0.
pub fn sym_normalize_adj(adj: &Array2<f32>) -> Array2<f32> {
    let inv: Array1<f32> = adj
        .sum_axis(Axis(0))
        .mapv(|d| if d > 0.0 { d.sqrt().recip() } else { 0.0 });
    Array2::from_shape_fn(adj.dim(), |(i, j)| inv[i] * adj[[i, j]] * inv[j])
}

/// Build the dense cube from the first sample.
///
/// Further samples are ignored with a warning.
pub fn collate_dense<'a, I>(samples: I) -> Result<DenseBatch>
where
    I: IntoIterator<Item = (&'a Graph, &'a Array1<i64>)>,
{
    let mut samples = samples.into_iter();
    let (g, labels) = samples.next().ok_or(Error::EmptyBatch)?;
    let ignored = samples.count();
    if ignored > 0 {
        warn!(ignored, "dense collation uses only the first sample");
    }

    let n = g.num_nodes();
    let x = g.node_features().to_dense();
    let d = x.ncols();

    let mut tensor = Array3::zeros((1 + d, n, n));
    tensor
        .index_axis_mut(Axis(0), 0)
        .assign(&sym_normalize_adj(&dense_adjacency(g)));
    for (node, row) in x.outer_iter().enumerate() {
        for (i, &v) in row.iter().enumerate() {
            tensor[[1 + i, node, node]] = v;
        }
    }

    Ok(DenseBatch {
        tensor,
        labels: labels.clone(),
    })
}
