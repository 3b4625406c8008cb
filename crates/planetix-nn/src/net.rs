//! GCN networks for node classification.
//!
//! Both networks embed a categorical node feature, run a stack of graph
//! convolutions and classify every node with an [`MLPReadout`].

use crate::conv::{GCNConv, GCNLayer};
use crate::loss::weighted_loss;
use crate::readout::MLPReadout;
use crate::{Error, Result};
use candle_core::{Module, ModuleT, Tensor};
use candle_nn::{batch_norm, embedding, BatchNorm, Dropout, Embedding, VarBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters shared by [`GCNNet`] and [`GCNNetPyg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Number of distinct categorical input values.
    pub in_dim: usize,
    pub hidden_dim: usize,
    pub out_dim: usize,
    pub n_classes: usize,
    pub in_feat_dropout: f32,
    pub dropout: f32,
    /// Number of graph convolution layers, `L`.
    pub n_layers: usize,
    pub batch_norm: bool,
    pub residual: bool,
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            in_dim: 3,
            hidden_dim: 146,
            out_dim: 146,
            n_classes: 6,
            in_feat_dropout: 0.0,
            dropout: 0.0,
            n_layers: 4,
            batch_norm: true,
            residual: true,
        }
    }
}

impl NetParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_layers == 0 {
            return Err(Error::InvalidConfig("need at least one layer".into()));
        }
        if self.in_dim == 0 || self.hidden_dim == 0 || self.out_dim == 0 || self.n_classes == 0 {
            return Err(Error::InvalidConfig("dimensions must be positive".into()));
        }
        for p in [self.in_feat_dropout, self.dropout] {
            if !(0.0..1.0).contains(&p) {
                return Err(Error::InvalidConfig(format!("dropout {p} outside [0, 1)")));
            }
        }
        Ok(())
    }
}

/// GCN with mean-aggregation layers.
///
/// `L - 1` hidden-to-hidden [`GCNLayer`]s plus one hidden-to-out layer.
/// Expects the operator from [`mean_adjacency`](crate::mean_adjacency).
pub struct GCNNet {
    embedding_h: Embedding,
    in_feat_dropout: Dropout,
    layers: Vec<GCNLayer>,
    readout: MLPReadout,
    n_classes: usize,
}

impl GCNNet {
    pub fn new(params: &NetParams, vb: VarBuilder) -> Result<Self> {
        params.validate()?;
        let embedding_h = embedding(params.in_dim, params.hidden_dim, vb.pp("embedding_h"))?;

        let mut layers = Vec::with_capacity(params.n_layers);
        for l in 0..params.n_layers {
            let out = if l + 1 == params.n_layers {
                params.out_dim
            } else {
                params.hidden_dim
            };
            layers.push(GCNLayer::new(
                params.hidden_dim,
                out,
                params.dropout,
                params.batch_norm,
                params.residual,
                vb.pp(format!("layers.{l}")),
            )?);
        }
        let readout = MLPReadout::new(params.out_dim, params.n_classes, vb.pp("mlp"))?;
        debug!(layers = params.n_layers, hidden = params.hidden_dim, out = params.out_dim, "built GCNNet");

        Ok(Self {
            embedding_h,
            in_feat_dropout: Dropout::new(params.in_feat_dropout),
            layers,
            readout,
            n_classes: params.n_classes,
        })
    }

    /// Class logits per node (N x n_classes).
    ///
    /// - `mean_adj`: row-normalized incoming adjacency (N x N)
    /// - `h`: categorical node ids (N,)
    pub fn forward(&self, mean_adj: &Tensor, h: &Tensor, train: bool) -> Result<Tensor> {
        let mut h = self.embedding_h.forward(h)?;
        h = self.in_feat_dropout.forward(&h, train)?;
        for layer in &self.layers {
            h = layer.forward(mean_adj, &h, train)?;
        }
        Ok(self.readout.forward(&h)?)
    }

    /// Class-weighted cross-entropy, see [`weighted_loss`].
    pub fn loss(&self, pred: &Tensor, labels: &Tensor) -> Result<Tensor> {
        weighted_loss(pred, labels, self.n_classes)
    }
}

/// GCN built from [`GCNConv`] layers.
///
/// Each layer: conv, optional batch norm, ReLU, optional residual, dropout.
/// Convolutions keep the hidden width, so `out_dim` must equal `hidden_dim`.
/// Expects the operator from [`gcn_norm_adjacency`](crate::gcn_norm_adjacency).
pub struct GCNNetPyg {
    embedding_h: Embedding,
    in_feat_dropout: Dropout,
    layers: Vec<GCNConv>,
    norms: Vec<BatchNorm>,
    residual: bool,
    dropout: Dropout,
    readout: MLPReadout,
    n_classes: usize,
}

impl GCNNetPyg {
    pub fn new(params: &NetParams, vb: VarBuilder) -> Result<Self> {
        params.validate()?;
        if params.out_dim != params.hidden_dim {
            return Err(Error::DimensionMismatch {
                expected: params.hidden_dim,
                got: params.out_dim,
            });
        }
        let embedding_h = embedding(params.in_dim, params.hidden_dim, vb.pp("embedding_h"))?;

        let layers = (0..params.n_layers)
            .map(|l| GCNConv::new(params.hidden_dim, params.hidden_dim, vb.pp(format!("layers.{l}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let norms = if params.batch_norm {
            (0..params.n_layers)
                .map(|l| batch_norm(params.hidden_dim, 1e-5, vb.pp(format!("normlayers.{l}"))))
                .collect::<candle_core::Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        let readout = MLPReadout::new(params.out_dim, params.n_classes, vb.pp("mlp"))?;
        debug!(layers = params.n_layers, hidden = params.hidden_dim, "built GCNNetPyg");

        Ok(Self {
            embedding_h,
            in_feat_dropout: Dropout::new(params.in_feat_dropout),
            layers,
            norms,
            residual: params.residual,
            dropout: Dropout::new(params.dropout),
            readout,
            n_classes: params.n_classes,
        })
    }

    /// Class logits per node (N x n_classes).
    pub fn forward(&self, norm_adj: &Tensor, h: &Tensor, train: bool) -> Result<Tensor> {
        let mut h = self.embedding_h.forward(h)?;
        h = self.in_feat_dropout.forward(&h, train)?;
        for (i, conv) in self.layers.iter().enumerate() {
            let h_in = h.clone();
            h = conv.forward(&h, norm_adj)?;
            if let Some(bn) = self.norms.get(i) {
                h = bn.forward_t(&h, train)?;
            }
            h = h.relu()?;
            if self.residual {
                h = (h_in + h)?;
            }
            h = self.dropout.forward(&h, train)?;
        }
        Ok(self.readout.forward(&h)?)
    }

    pub fn loss(&self, pred: &Tensor, labels: &Tensor) -> Result<Tensor> {
        weighted_loss(pred, labels, self.n_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn small_params() -> NetParams {
        NetParams {
            in_dim: 3,
            hidden_dim: 16,
            out_dim: 16,
            n_classes: 4,
            n_layers: 2,
            ..NetParams::default()
        }
    }

    fn inputs(device: &Device) -> (Tensor, Tensor) {
        let adj = Tensor::eye(6, DType::F32, device).unwrap();
        let h = Tensor::new(&[0u32, 1, 2, 0, 1, 2], device).unwrap();
        (adj, h)
    }

    #[test]
    fn test_gcn_net_logits_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = GCNNet::new(&small_params(), vb).unwrap();

        let (adj, h) = inputs(&device);
        let logits = net.forward(&adj, &h, true).unwrap();
        assert_eq!(logits.dims(), &[6, 4]);

        let labels = Tensor::new(&[0u32, 1, 2, 3, 0, 1], &device).unwrap();
        let loss = net.loss(&logits, &labels).unwrap();
        assert!(loss.to_scalar::<f32>().unwrap().is_finite());
    }

    #[test]
    fn test_gcn_net_pyg_logits_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = GCNNetPyg::new(&small_params(), vb).unwrap();

        let (adj, h) = inputs(&device);
        let logits = net.forward(&adj, &h, false).unwrap();
        assert_eq!(logits.dims(), &[6, 4]);
    }

    #[test]
    fn test_pyg_requires_matching_out_dim() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let params = NetParams {
            out_dim: 8,
            ..small_params()
        };
        assert!(GCNNetPyg::new(&params, vb).is_err());
    }

    #[test]
    fn test_params_from_partial_json() {
        let p: NetParams = serde_json::from_str(r#"{"hidden_dim": 32, "n_layers": 2}"#).unwrap();
        assert_eq!(p.hidden_dim, 32);
        assert_eq!(p.n_classes, 6);
        assert!(p.validate().is_ok());
    }
}
