//! Graph convolution layers.
//!
//! - [`GCNLayer`]: mean aggregation over in-neighbours, then a linear map,
//!   optional batch norm, ReLU, optional residual and dropout
//! - [`GCNConv`]: Kipf & Welling convolution over `D^{-1/2}(A + I)D^{-1/2}`
//!
//! Both take the graph as a dense `(N, N)` operator from
//! [`adjacency`](crate::adjacency).

use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn::{batch_norm, linear, linear_no_bias, BatchNorm, Dropout, Init, Linear, VarBuilder};

/// GCN layer with mean aggregation.
///
/// ```text
/// h' = dropout(h + relu(BN(W * mean_{j -> i} h_j + b)))
/// ```
///
/// The residual term is only used when input and output widths agree.
pub struct GCNLayer {
    linear: Linear,
    batch_norm: Option<BatchNorm>,
    residual: bool,
    dropout: Dropout,
}

impl GCNLayer {
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        dropout: f32,
        use_batch_norm: bool,
        residual: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let linear = linear(in_dim, out_dim, vb.pp("linear"))?;
        let batch_norm = if use_batch_norm {
            Some(batch_norm(out_dim, 1e-5, vb.pp("batchnorm_h"))?)
        } else {
            None
        };
        Ok(Self {
            linear,
            batch_norm,
            residual: residual && in_dim == out_dim,
            dropout: Dropout::new(dropout),
        })
    }

    /// Forward pass.
    ///
    /// - `mean_adj`: row-normalized incoming adjacency (N x N)
    /// - `h`: node features (N x in_dim)
    pub fn forward(&self, mean_adj: &Tensor, h: &Tensor, train: bool) -> Result<Tensor> {
        let agg = mean_adj.matmul(h)?;
        let mut out = self.linear.forward(&agg)?;
        if let Some(bn) = &self.batch_norm {
            out = bn.forward_t(&out, train)?;
        }
        out = out.relu()?;
        if self.residual {
            out = (h + out)?;
        }
        self.dropout.forward(&out, train)
    }
}

/// Graph Convolutional Network layer.
///
/// Implements `H' = A_hat H W + b` with `A_hat = D^{-1/2}(A + I)D^{-1/2}`.
/// The bias is added after aggregation.
///
/// # Reference
///
/// Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
/// Networks", ICLR 2017.
pub struct GCNConv {
    linear: Linear,
    bias: Tensor,
}

impl GCNConv {
    pub fn new(in_features: usize, out_features: usize, vb: VarBuilder) -> Result<Self> {
        let linear = linear_no_bias(in_features, out_features, vb.pp("lin"))?;
        let bias = vb.get_with_hints(out_features, "bias", Init::Const(0.0))?;
        Ok(Self { linear, bias })
    }

    /// Forward pass.
    ///
    /// - `x`: node features (N x in_features)
    /// - `norm_adj`: normalized adjacency with self-loops (N x N)
    pub fn forward(&self, x: &Tensor, norm_adj: &Tensor) -> Result<Tensor> {
        let h = self.linear.forward(x)?;
        norm_adj.matmul(&h)?.broadcast_add(&self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_gcn_layer_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let layer = GCNLayer::new(16, 8, 0.0, true, true, vb).unwrap();
        assert!(!layer.residual);

        let x = Tensor::randn(0f32, 1f32, (10, 16), &device).unwrap();
        let adj = Tensor::eye(10, DType::F32, &device).unwrap();
        let out = layer.forward(&adj, &x, true).unwrap();
        assert_eq!(out.dims(), &[10, 8]);
    }

    #[test]
    fn test_gcn_layer_residual_keeps_input() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let layer = GCNLayer::new(4, 4, 0.0, false, true, vb).unwrap();
        assert!(layer.residual);

        // relu output is non-negative, so h' >= h everywhere
        let x = Tensor::randn(0f32, 1f32, (5, 4), &device).unwrap();
        let adj = Tensor::eye(5, DType::F32, &device).unwrap();
        let out = layer.forward(&adj, &x, false).unwrap();
        let diff = (out - &x).unwrap().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(diff.iter().all(|&d| d >= -1e-6));
    }

    #[test]
    fn test_gcn_conv_identity_is_linear() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = GCNConv::new(6, 3, vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (7, 6), &device).unwrap();
        let eye = Tensor::eye(7, DType::F32, &device).unwrap();

        let out = conv.forward(&x, &eye).unwrap();
        let direct = conv.linear.forward(&x).unwrap();
        let gap = (out - direct)
            .unwrap()
            .abs()
            .unwrap()
            .max_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(gap < 1e-6);
    }
}
