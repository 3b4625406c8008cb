//! Class-weighted cross-entropy for unbalanced node classification.

use crate::{Error, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::log_softmax;

/// Per-class weights `(V - count_c) / V` for classes present in `labels`,
/// 0 for absent classes. `V` is the number of labels.
pub fn class_weights(labels: &[u32], n_classes: usize) -> Result<Vec<f32>> {
    let mut counts = vec![0usize; n_classes];
    for &l in labels {
        let slot = counts
            .get_mut(l as usize)
            .ok_or_else(|| Error::Labels(format!("label {l} outside 0..{n_classes}")))?;
        *slot += 1;
    }
    let v = labels.len() as f32;
    Ok(counts
        .into_iter()
        .map(|c| if c > 0 { (v - c as f32) / v } else { 0.0 })
        .collect())
}

/// Weighted cross-entropy, reduced by the weighted mean.
///
/// ```text
/// loss = sum_i w[y_i] * -log softmax(pred_i)[y_i] / sum_i w[y_i]
/// ```
///
/// - `pred`: logits (V x n_classes)
/// - `labels`: class ids (V,), any integer dtype
///
/// A batch holding a single class has all-zero weights and is rejected.
pub fn weighted_loss(pred: &Tensor, labels: &Tensor, n_classes: usize) -> Result<Tensor> {
    let (rows, cols) = pred.dims2()?;
    if cols != n_classes {
        return Err(Error::DimensionMismatch {
            expected: n_classes,
            got: cols,
        });
    }
    let labels = labels.to_dtype(DType::U32)?;
    let ids = labels.to_vec1::<u32>()?;
    if ids.len() != rows {
        return Err(Error::DimensionMismatch {
            expected: rows,
            got: ids.len(),
        });
    }

    let weights = class_weights(&ids, n_classes)?;
    let per_sample: Vec<f32> = ids.iter().map(|&l| weights[l as usize]).collect();
    let total: f32 = per_sample.iter().sum();
    if total <= 0.0 {
        return Err(Error::Labels(
            "every class weight is zero (only one class in the batch)".into(),
        ));
    }

    let device: &Device = pred.device();
    let w = Tensor::from_vec(per_sample, rows, device)?;
    let log_p = log_softmax(pred, D::Minus1)?;
    let nll = log_p.gather(&labels.unsqueeze(1)?, 1)?.squeeze(1)?.neg()?;
    let loss = (nll * w)?.sum_all()?.affine(1.0 / f64::from(total), 0.0)?;
    Ok(loss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_weights() {
        let w = class_weights(&[0, 0, 1], 3).unwrap();
        assert!((w[0] - 1.0 / 3.0).abs() < 1e-6);
        assert!((w[1] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(w[2], 0.0);
        assert!(class_weights(&[3], 3).is_err());
    }

    #[test]
    fn test_uniform_logits_give_log_c() {
        let device = Device::Cpu;
        let pred = Tensor::zeros((4, 3), DType::F32, &device).unwrap();
        let labels = Tensor::new(&[0u32, 1, 1, 2], &device).unwrap();
        let loss = weighted_loss(&pred, &labels, 3)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((loss - 3f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_confident_correct_prediction_is_small() {
        let device = Device::Cpu;
        let pred = Tensor::new(&[[10f32, 0.0], [0.0, 10.0], [10.0, 0.0]], &device).unwrap();
        let labels = Tensor::new(&[0i64, 1, 0], &device).unwrap();
        let loss = weighted_loss(&pred, &labels, 2)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss < 1e-3);
    }

    #[test]
    fn test_single_class_rejected() {
        let device = Device::Cpu;
        let pred = Tensor::zeros((2, 2), DType::F32, &device).unwrap();
        let labels = Tensor::new(&[1u32, 1], &device).unwrap();
        assert!(matches!(
            weighted_loss(&pred, &labels, 2),
            Err(Error::Labels(_))
        ));
    }
}
