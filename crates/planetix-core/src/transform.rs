//! Graph normalization.
//!
//! Rewrites raw graph records into the canonical form the models consume:
//! float node features, edge features always present, and (on request)
//! exactly one self-loop per node.
//!
//! Every function here borrows its input and returns a new [`Graph`]; the
//! result owns its feature storage.

use crate::{EdgeFeatures, Graph, NodeFeatures};
use ndarray::Array2;

/// Canonicalize a graph record.
///
/// - node features are coerced to `f32`;
/// - when the graph has no edge features, every edge gets an all-ones vector
///   whose width equals the node-feature width. Existing edge features are
///   kept as they are.
///
/// The positional encoding, if any, is carried over.
pub fn normalize(graph: &Graph) -> Graph {
    let node_features = graph.node_features().to_dense();
    let width = node_features.ncols();

    let edge_features = match graph.edge_features() {
        EdgeFeatures::Present(x) => EdgeFeatures::Present(x.clone()),
        EdgeFeatures::Absent => EdgeFeatures::Present(Array2::ones((graph.num_edges(), width))),
    };

    Graph::from_trusted_parts(
        graph.num_nodes(),
        graph.src().to_vec(),
        graph.dst().to_vec(),
        NodeFeatures::Dense(node_features),
        edge_features,
        graph.pos_enc().cloned(),
    )
}

/// Give every node exactly one self-loop.
///
/// Existing `(v, v)` edges are dropped first, the remaining edges keep their
/// order, then the loops `(0, 0) .. (N-1, N-1)` are appended.
///
/// The edge-feature matrix is rebuilt as zeros of width 1 for all edges,
/// whatever width the input carried. The positional encoding is dropped since
/// it was computed on the old topology.
pub fn add_self_loops(graph: &Graph) -> Graph {
    let n = graph.num_nodes();
    let kept = graph.num_edges() - graph.num_self_loops();

    let mut src = Vec::with_capacity(kept + n);
    let mut dst = Vec::with_capacity(kept + n);
    for (s, d) in graph.edges().filter(|(s, d)| s != d) {
        src.push(s);
        dst.push(d);
    }
    src.extend(0..n);
    dst.extend(0..n);

    let edge_features = EdgeFeatures::Present(Array2::zeros((src.len(), 1)));

    Graph::from_trusted_parts(
        n,
        src,
        dst,
        graph.node_features().clone(),
        edge_features,
        None,
    )
}

/// [`normalize`] followed by [`add_self_loops`] when `self_loop` is set.
pub fn canonicalize(graph: &Graph, self_loop: bool) -> Graph {
    let g = normalize(graph);
    if self_loop {
        add_self_loops(&g)
    } else {
        g
    }
}
