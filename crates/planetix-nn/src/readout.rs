//! MLP readout head.

use candle_core::{Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Stack of linear layers halving the width at each hidden step.
///
/// With `L = 2`: `in -> in/2 -> in/4 -> out`, ReLU between layers.
pub struct MLPReadout {
    hidden: Vec<Linear>,
    output: Linear,
}

impl MLPReadout {
    /// Readout with the default two hidden layers.
    pub fn new(input_dim: usize, output_dim: usize, vb: VarBuilder) -> Result<Self> {
        Self::with_layers(input_dim, output_dim, 2, vb)
    }

    pub fn with_layers(
        input_dim: usize,
        output_dim: usize,
        num_hidden: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mut hidden = Vec::with_capacity(num_hidden);
        let mut width = input_dim;
        for l in 0..num_hidden {
            let next = (width / 2).max(1);
            hidden.push(linear(width, next, vb.pp(format!("layer_{l}")))?);
            width = next;
        }
        let output = linear(width, output_dim, vb.pp(format!("layer_{num_hidden}")))?;
        Ok(Self { hidden, output })
    }
}

impl Module for MLPReadout {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut h = x.clone();
        for layer in &self.hidden {
            h = layer.forward(&h)?.relu()?;
        }
        self.output.forward(&h)
    }
}
