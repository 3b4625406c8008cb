//! GCN networks driven by real graph records.

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use ndarray::Array2;
use planetix_core::{Graph, NodeFeatures};
use planetix_nn::{
    feature_indices, gcn_norm_adjacency, mean_adjacency, GCNNet, GCNNetPyg, NetParams,
};

/// Two 4-cliques joined by one edge; node ids cycle through 0..3.
fn two_cliques() -> (Graph, Vec<u32>) {
    let mut edges = Vec::new();
    for block in [0usize, 4] {
        for i in 0..4 {
            for j in 0..4 {
                if i != j {
                    edges.push((block + i, block + j));
                }
            }
        }
    }
    edges.push((3, 4));
    edges.push((4, 3));
    let x = Array2::from_shape_fn((8, 1), |(i, _)| (i % 3) as i64);
    let g = Graph::new(8, edges, NodeFeatures::Categorical(x)).unwrap();
    (g, vec![0, 0, 0, 0, 1, 1, 1, 1])
}

fn params() -> NetParams {
    NetParams {
        in_dim: 3,
        hidden_dim: 8,
        out_dim: 8,
        n_classes: 2,
        n_layers: 2,
        ..NetParams::default()
    }
}

#[test]
fn test_gcn_net_on_graph_backpropagates() {
    let device = Device::Cpu;
    let (g, labels) = two_cliques();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let net = GCNNet::new(&params(), vb).unwrap();

    let adj = mean_adjacency(&g, &device).unwrap();
    let h = feature_indices(&g, &device).unwrap();
    let labels = Tensor::new(labels.as_slice(), &device).unwrap();

    let logits = net.forward(&adj, &h, true).unwrap();
    assert_eq!(logits.dims(), &[8, 2]);

    let loss = net.loss(&logits, &labels).unwrap();
    let grads = loss.backward().unwrap();
    let with_grad = varmap
        .all_vars()
        .iter()
        .filter(|v| grads.get(v.as_tensor()).is_some())
        .count();
    assert!(with_grad > 0);
}

#[test]
fn test_gcn_net_pyg_on_graph() {
    let device = Device::Cpu;
    let (g, labels) = two_cliques();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let net = GCNNetPyg::new(&params(), vb).unwrap();

    let adj = gcn_norm_adjacency(&g, &device).unwrap();
    let h = feature_indices(&g, &device).unwrap();
    let labels = Tensor::new(labels.as_slice(), &device).unwrap();

    let logits = net.forward(&adj, &h, false).unwrap();
    let loss = net.loss(&logits, &labels).unwrap().to_scalar::<f32>().unwrap();
    assert!(loss.is_finite() && loss > 0.0);
}
