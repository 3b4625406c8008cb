//! Dense adjacency tensors for the GCN layers.
//!
//! Messages flow along edges, so row `d` of every matrix here gathers from the
//! sources of the edges entering `d`: `M[d][s]` is nonzero for an edge `s -> d`.

use crate::{Error, Result};
use candle_core::{Device, Tensor};
use ndarray::Array2;
use planetix_core::{Graph, NodeFeatures};

fn incoming(graph: &Graph) -> Array2<f32> {
    let n = graph.num_nodes();
    let mut m = Array2::zeros((n, n));
    for (s, d) in graph.edges() {
        m[[d, s]] += 1.0;
    }
    m
}

fn to_tensor(m: Array2<f32>, device: &Device) -> Result<Tensor> {
    let shape = m.dim();
    let data = m.into_raw_vec();
    Ok(Tensor::from_vec(data, shape, device)?)
}

/// Incoming adjacency with each row divided by the node's in-degree.
///
/// `M X` averages the features of every node's in-neighbours; nodes with no
/// incoming edge get a zero row.
pub fn mean_adjacency(graph: &Graph, device: &Device) -> Result<Tensor> {
    let mut m = incoming(graph);
    for mut row in m.rows_mut() {
        let deg: f32 = row.sum();
        if deg > 0.0 {
            row /= deg;
        }
    }
    to_tensor(m, device)
}

/// `D^{-1/2} (A + I) D^{-1/2}` as used by [`GCNConv`](crate::GCNConv).
///
/// Self-loops are added only to nodes that lack one. Degrees are in-degrees
/// of `A + I`.
pub fn gcn_norm_adjacency(graph: &Graph, device: &Device) -> Result<Tensor> {
    let mut m = incoming(graph);
    for i in 0..graph.num_nodes() {
        if m[[i, i]] == 0.0 {
            m[[i, i]] = 1.0;
        }
    }
    let inv: Vec<f32> = m
        .rows()
        .into_iter()
        .map(|row| {
            let deg: f32 = row.sum();
            if deg > 0.0 {
                deg.sqrt().recip()
            } else {
                0.0
            }
        })
        .collect();
    for ((d, s), v) in m.indexed_iter_mut() {
        *v *= inv[d] * inv[s];
    }
    to_tensor(m, device)
}

/// Categorical node ids as a `(N,)` u32 tensor for an embedding lookup.
///
/// The graph must carry categorical features of width 1 with non-negative
/// values.
pub fn feature_indices(graph: &Graph, device: &Device) -> Result<Tensor> {
    let NodeFeatures::Categorical(x) = graph.node_features() else {
        return Err(Error::InvalidConfig(
            "embedding input needs categorical node features".into(),
        ));
    };
    if x.ncols() != 1 {
        return Err(Error::DimensionMismatch {
            expected: 1,
            got: x.ncols(),
        });
    }
    let ids = x
        .column(0)
        .iter()
        .map(|&v| {
            u32::try_from(v).map_err(|_| Error::InvalidConfig(format!("feature id {v} out of range")))
        })
        .collect::<Result<Vec<u32>>>()?;
    let n = ids.len();
    Ok(Tensor::from_vec(ids, n, device)?)
}
