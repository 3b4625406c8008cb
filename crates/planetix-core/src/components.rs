//! Weakly connected components of graph records.
//!
//! Edges are treated as undirected. Every extra component adds a zero
//! eigenvalue to the Laplacian, so `planetix stats` reports them next to the
//! positional-encoding inputs.
//!
//! Components are returned as node-id lists, each sorted ascending, ordered
//! by their smallest node.

use crate::Graph;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weakly connected components via union-find, O(V + E * alpha(V)).
///
/// Isolated nodes form singleton components.
#[must_use]
pub fn connected_components(graph: &Graph) -> Vec<Vec<usize>> {
    let n = graph.num_nodes();
    let mut uf = UnionFind::<usize>::new(n);
    for (s, d) in graph.edges() {
        uf.union(s, d);
    }

    // keyed by representative; nodes are visited in order so each list comes out sorted
    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (v, root) in uf.into_labeling().into_iter().enumerate() {
        by_root.entry(root).or_default().push(v);
    }

    let mut components: Vec<Vec<usize>> = by_root.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

/// Statistics about connected components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub num_components: usize,
    pub max_component_size: usize,
    pub min_component_size: usize,
    pub avg_component_size: f64,
    /// Fraction of nodes in the largest component.
    pub largest_component_fraction: f64,
}

/// Summarize a component list. All zeros when `components` is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn component_stats(components: &[Vec<usize>]) -> ComponentStats {
    let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
    let total: usize = sizes.iter().sum();
    let max_size = sizes.iter().copied().max().unwrap_or(0);
    let min_size = sizes.iter().copied().min().unwrap_or(0);

    ComponentStats {
        num_components: components.len(),
        max_component_size: max_size,
        min_component_size: min_size,
        avg_component_size: if components.is_empty() {
            0.0
        } else {
            total as f64 / components.len() as f64
        },
        largest_component_fraction: if total > 0 {
            max_size as f64 / total as f64
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeFeatures;
    use ndarray::Array2;

    fn graph(n: usize, edges: Vec<(usize, usize)>) -> Graph {
        Graph::new(n, edges, NodeFeatures::Dense(Array2::zeros((n, 1)))).unwrap()
    }

    #[test]
    fn test_chain_is_one_weak_component() {
        let g = graph(3, vec![(0, 1), (1, 2)]);
        assert_eq!(connected_components(&g), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_directions_are_ignored() {
        let g = graph(6, vec![(0, 1), (2, 1), (5, 4), (4, 3)]);
        assert_eq!(connected_components(&g), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_isolated_nodes() {
        let g = graph(5, vec![(3, 1)]);
        let comps = connected_components(&g);
        assert_eq!(comps, vec![vec![0], vec![1, 3], vec![2], vec![4]]);

        let stats = component_stats(&comps);
        assert_eq!(stats.num_components, 4);
        assert_eq!(stats.max_component_size, 2);
        assert_eq!(stats.min_component_size, 1);
        assert!((stats.largest_component_fraction - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stats() {
        let stats = component_stats(&[]);
        assert_eq!(stats.num_components, 0);
        assert_eq!(stats.avg_component_size, 0.0);
    }
}
