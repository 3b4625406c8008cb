//! Property-based tests for graph normalization and Laplacians.
//!
//! These hold for any graph record:
//! - normalization synthesizes edge features of the node-feature width
//! - the self-loop pass leaves exactly one loop per node
//! - normalized Laplacians of undirected graphs are symmetric
//! - components partition the node set

use ndarray::Array2;
use planetix_core::transform::{add_self_loops, normalize};
use planetix_core::{connected_components, normalized_laplacian, EdgeFeatures, Graph, NodeFeatures};
use proptest::prelude::*;

/// Random graph with categorical features of random width.
fn arb_graph() -> impl Strategy<Value = Graph> {
    (1usize..30, 1usize..6).prop_flat_map(|(n, width)| {
        let edges = prop::collection::vec((0..n, 0..n), 0..80);
        let features = prop::collection::vec(0i64..10, n * width);
        (edges, features).prop_map(move |(edges, features)| {
            let x = Array2::from_shape_vec((n, width), features).unwrap();
            Graph::new(n, edges, NodeFeatures::Categorical(x)).unwrap()
        })
    })
}

/// Random undirected graph: every edge stored in both directions.
fn arb_undirected() -> impl Strategy<Value = Graph> {
    (2usize..25).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..60).prop_map(move |pairs| {
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .flat_map(|(a, b)| [(a, b), (b, a)])
                .collect();
            Graph::new(n, edges, NodeFeatures::Dense(Array2::zeros((n, 1)))).unwrap()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn normalize_synthesizes_ones_of_node_width(g in arb_graph()) {
        let out = normalize(&g);
        let width = g.node_features().width();

        prop_assert!(out.node_features().is_dense());
        let ef = out.edge_features().as_array().unwrap();
        prop_assert_eq!(ef.dim(), (g.num_edges(), width));
        prop_assert!(ef.iter().all(|&v| v == 1.0));
        prop_assert_eq!(out.src(), g.src());
        prop_assert_eq!(out.dst(), g.dst());
    }

    #[test]
    fn normalize_never_mutates_input(g in arb_graph()) {
        let before = g.clone();
        let _ = normalize(&g);
        prop_assert_eq!(g.edge_features(), &EdgeFeatures::Absent);
        prop_assert_eq!(g, before);
    }

    #[test]
    fn self_loops_exactly_one_per_node(g in arb_graph()) {
        let looped = add_self_loops(&normalize(&g));
        let n = g.num_nodes();

        let mut loops = vec![0usize; n];
        for (s, d) in looped.edges() {
            if s == d {
                loops[s] += 1;
            }
        }
        prop_assert!(loops.iter().all(|&c| c == 1));
        prop_assert_eq!(looped.num_edges(), g.num_edges() - g.num_self_loops() + n);
        prop_assert_eq!(looped.edge_features().width(), Some(1));
    }

    #[test]
    fn self_loop_pass_is_idempotent(g in arb_graph()) {
        let once = add_self_loops(&g);
        let twice = add_self_loops(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn laplacian_of_undirected_graph_is_symmetric(g in arb_undirected()) {
        let l = normalized_laplacian(&g);
        prop_assert!(l.is_symmetric(1e-12));
        for i in 0..g.num_nodes() {
            prop_assert!((l.get(i, i) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn components_partition_nodes(g in arb_graph()) {
        let comps = connected_components(&g);
        let mut seen: Vec<usize> = comps.into_iter().flatten().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..g.num_nodes()).collect::<Vec<_>>());
    }
}
