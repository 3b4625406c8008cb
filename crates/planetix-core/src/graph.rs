use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-node input features.
///
/// Citation graphs ship bag-of-words floats; SBM graphs ship one integer
/// per node that models feed through an embedding table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeFeatures {
    /// Integer (categorical) features, N x d.
    Categorical(Array2<i64>),
    /// Floating point features, N x d.
    Dense(Array2<f32>),
}

impl NodeFeatures {
    /// Number of rows (one per node).
    pub fn num_rows(&self) -> usize {
        match self {
            Self::Categorical(x) => x.nrows(),
            Self::Dense(x) => x.nrows(),
        }
    }

    /// Feature width d.
    pub fn width(&self) -> usize {
        match self {
            Self::Categorical(x) => x.ncols(),
            Self::Dense(x) => x.ncols(),
        }
    }

    /// Float copy of the features. Categorical values are cast.
    pub fn to_dense(&self) -> Array2<f32> {
        match self {
            Self::Categorical(x) => x.mapv(|v| v as f32),
            Self::Dense(x) => x.clone(),
        }
    }

    /// Borrow the float features, if the features are already dense.
    pub fn as_dense(&self) -> Option<&Array2<f32>> {
        match self {
            Self::Dense(x) => Some(x),
            Self::Categorical(_) => None,
        }
    }

    /// Borrow the integer features, if the features are categorical.
    pub fn as_categorical(&self) -> Option<&Array2<i64>> {
        match self {
            Self::Categorical(x) => Some(x),
            Self::Dense(_) => None,
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }
}

/// Edge-feature state of a graph.
///
/// Presence is part of the type: consumers that need edge features match on
/// `Absent` instead of probing for a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum EdgeFeatures {
    /// The graph carries no edge features.
    #[default]
    Absent,
    /// One feature row per edge, E x w.
    Present(Array2<f32>),
}

impl EdgeFeatures {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrow the feature matrix when present.
    pub fn as_array(&self) -> Option<&Array2<f32>> {
        match self {
            Self::Present(x) => Some(x),
            Self::Absent => None,
        }
    }

    /// Feature width when present.
    pub fn width(&self) -> Option<usize> {
        self.as_array().map(Array2::ncols)
    }
}

/// A graph record: directed edge list plus node, edge and positional features.
///
/// Undirected graphs store both directions of every edge, the way citation
/// datasets are distributed to GNN code. Node ids are `0..num_nodes`.
///
/// # Example
///
/// ```rust
/// use ndarray::Array2;
/// use planetix_core::{Graph, NodeFeatures};
///
/// let g = Graph::new(
///     3,
///     vec![(0, 1), (1, 0), (1, 2), (2, 1)],
///     NodeFeatures::Dense(Array2::zeros((3, 4))),
/// )
/// .unwrap();
///
/// assert_eq!(g.num_edges(), 4);
/// assert!(g.is_symmetric());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    num_nodes: usize,
    src: Vec<usize>,
    dst: Vec<usize>,
    node_features: NodeFeatures,
    edge_features: EdgeFeatures,
    pos_enc: Option<Array2<f32>>,
}

impl Graph {
    /// Build a graph without edge features.
    pub fn new(
        num_nodes: usize,
        edges: Vec<(usize, usize)>,
        node_features: NodeFeatures,
    ) -> Result<Self> {
        let (src, dst) = edges.into_iter().unzip();
        Self::from_parts(num_nodes, src, dst, node_features, EdgeFeatures::Absent)
    }

    /// Build a graph from parallel source/destination arrays.
    ///
    /// Validates edge endpoints and feature row counts.
    pub fn from_parts(
        num_nodes: usize,
        src: Vec<usize>,
        dst: Vec<usize>,
        node_features: NodeFeatures,
        edge_features: EdgeFeatures,
    ) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(Error::InvalidGraph(format!(
                "{} sources but {} destinations",
                src.len(),
                dst.len()
            )));
        }
        if let Some(&bad) = src.iter().chain(dst.iter()).find(|&&v| v >= num_nodes) {
            return Err(Error::InvalidGraph(format!(
                "edge endpoint {bad} out of range for {num_nodes} nodes"
            )));
        }
        if node_features.num_rows() != num_nodes {
            return Err(Error::DimensionMismatch {
                what: "node features",
                expected: num_nodes,
                got: node_features.num_rows(),
            });
        }
        check_edge_features(&edge_features, src.len())?;

        Ok(Self {
            num_nodes,
            src,
            dst,
            node_features,
            edge_features,
            pos_enc: None,
        })
    }

    /// Assemble a graph whose invariants the caller already guarantees.
    pub(crate) fn from_trusted_parts(
        num_nodes: usize,
        src: Vec<usize>,
        dst: Vec<usize>,
        node_features: NodeFeatures,
        edge_features: EdgeFeatures,
        pos_enc: Option<Array2<f32>>,
    ) -> Self {
        debug_assert_eq!(src.len(), dst.len());
        debug_assert_eq!(node_features.num_rows(), num_nodes);
        Self {
            num_nodes,
            src,
            dst,
            node_features,
            edge_features,
            pos_enc,
        }
    }

    /// Replace the edge features.
    pub fn with_edge_features(mut self, edge_features: EdgeFeatures) -> Result<Self> {
        check_edge_features(&edge_features, self.num_edges())?;
        self.edge_features = edge_features;
        Ok(self)
    }

    /// Attach a positional encoding (N x k).
    pub fn with_pos_enc(mut self, pos_enc: Array2<f32>) -> Result<Self> {
        self.set_pos_enc(pos_enc)?;
        Ok(self)
    }

    /// Attach a positional encoding in place.
    pub fn set_pos_enc(&mut self, pos_enc: Array2<f32>) -> Result<()> {
        if pos_enc.nrows() != self.num_nodes {
            return Err(Error::DimensionMismatch {
                what: "positional encoding",
                expected: self.num_nodes,
                got: pos_enc.nrows(),
            });
        }
        self.pos_enc = Some(pos_enc);
        Ok(())
    }

    /// Replace the node features, keeping everything else.
    pub fn set_node_features(&mut self, node_features: NodeFeatures) -> Result<()> {
        if node_features.num_rows() != self.num_nodes {
            return Err(Error::DimensionMismatch {
                what: "node features",
                expected: self.num_nodes,
                got: node_features.num_rows(),
            });
        }
        self.node_features = node_features;
        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    pub fn src(&self) -> &[usize] {
        &self.src
    }

    pub fn dst(&self) -> &[usize] {
        &self.dst
    }

    /// Iterate over `(src, dst)` pairs in edge-id order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }

    pub fn node_features(&self) -> &NodeFeatures {
        &self.node_features
    }

    pub fn edge_features(&self) -> &EdgeFeatures {
        &self.edge_features
    }

    pub fn pos_enc(&self) -> Option<&Array2<f32>> {
        self.pos_enc.as_ref()
    }

    /// Number of `(v, v)` edges.
    pub fn num_self_loops(&self) -> usize {
        self.edges().filter(|(s, d)| s == d).count()
    }

    /// Incoming edge count per node. O(E).
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut deg = vec![0; self.num_nodes];
        for &d in &self.dst {
            deg[d] += 1;
        }
        deg
    }

    /// Outgoing edge count per node. O(E).
    pub fn out_degrees(&self) -> Vec<usize> {
        let mut deg = vec![0; self.num_nodes];
        for &s in &self.src {
            deg[s] += 1;
        }
        deg
    }

    /// True when every edge `(u, v)` has a matching `(v, u)` with the same multiplicity.
    pub fn is_symmetric(&self) -> bool {
        let mut forward: Vec<(usize, usize)> = self.edges().collect();
        let mut backward: Vec<(usize, usize)> = self.edges().map(|(s, d)| (d, s)).collect();
        forward.sort_unstable();
        backward.sort_unstable();
        forward == backward
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> GraphStats {
        let avg_degree = if self.num_nodes > 0 {
            self.num_edges() as f64 / self.num_nodes as f64
        } else {
            0.0
        };
        GraphStats {
            num_nodes: self.num_nodes,
            num_edges: self.num_edges(),
            num_self_loops: self.num_self_loops(),
            node_feature_width: self.node_features.width(),
            edge_feature_width: self.edge_features.width(),
            pos_enc_width: self.pos_enc.as_ref().map(Array2::ncols),
            avg_degree,
        }
    }
}

fn check_edge_features(edge_features: &EdgeFeatures, num_edges: usize) -> Result<()> {
    match edge_features {
        EdgeFeatures::Present(x) if x.nrows() != num_edges => Err(Error::DimensionMismatch {
            what: "edge features",
            expected: num_edges,
            got: x.nrows(),
        }),
        _ => Ok(()),
    }
}

/// Statistics about a graph record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub num_self_loops: usize,
    pub node_feature_width: usize,
    /// `None` when the graph has no edge features.
    pub edge_feature_width: Option<usize>,
    pub pos_enc_width: Option<usize>,
    /// Directed edges per node.
    pub avg_degree: f64,
}
