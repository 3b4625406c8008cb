//! External node embeddings stored as safetensors.
//!
//! The file `<root>/embedding_<name>.safetensors` holds one 2-D tensor, N x e,
//! under the key `embedding` (or as the only tensor in the file). Its rows are
//! appended to the node features.

use crate::{Error, Result};
use candle_core::{DType, Device, Tensor};
use ndarray::{concatenate, Array2, Axis};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const EMBEDDING_KEY: &str = "embedding";

/// `<root>/embedding_<name>.safetensors`
pub fn embedding_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("embedding_{name}.safetensors"))
}

/// Load an embedding matrix as `f32`.
pub fn load_embedding(path: &Path) -> Result<Array2<f32>> {
    if !path.exists() {
        return Err(Error::MissingResource {
            path: path.to_path_buf(),
        });
    }
    let mut tensors = candle_core::safetensors::load(path, &Device::Cpu)?;
    let tensor = match tensors.remove(EMBEDDING_KEY) {
        Some(t) => t,
        None if tensors.len() == 1 => tensors
            .into_values()
            .next()
            .ok_or_else(|| Error::InvalidConfig("empty embedding file".into()))?,
        None => {
            return Err(Error::InvalidConfig(format!(
                "{} has {} tensors and none named `{EMBEDDING_KEY}`",
                path.display(),
                tensors.len()
            )))
        }
    };

    let (rows, cols) = tensor.dims2()?;
    let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::InvalidConfig(format!("embedding shape: {e}")))
}

/// Write an embedding matrix under the `embedding` key.
pub fn save_embedding(path: &Path, embedding: &Array2<f32>) -> Result<()> {
    let (rows, cols) = embedding.dim();
    let data: Vec<f32> = embedding.iter().copied().collect();
    let tensor = Tensor::from_vec(data, (rows, cols), &Device::Cpu)?;
    let tensors = HashMap::from([(EMBEDDING_KEY.to_string(), tensor)]);
    candle_core::safetensors::save(&tensors, path)?;
    Ok(())
}

/// Append the embedding columns to `features`.
pub fn concat_features(features: &Array2<f32>, embedding: &Array2<f32>) -> Result<Array2<f32>> {
    if features.nrows() != embedding.nrows() {
        return Err(Error::Core(planetix_core::Error::DimensionMismatch {
            what: "embedding rows",
            expected: features.nrows(),
            got: embedding.nrows(),
        }));
    }
    concatenate(Axis(1), &[features.view(), embedding.view()])
        .map_err(|e| Error::InvalidConfig(format!("embedding concat: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_roundtrip_and_concat() {
        let dir = tempfile::tempdir().unwrap();
        let path = embedding_path(dir.path(), "toy");
        assert!(path.ends_with("embedding_toy.safetensors"));

        let emb = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        save_embedding(&path, &emb).unwrap();
        let loaded = load_embedding(&path).unwrap();
        assert_eq!(loaded, emb);

        let x = Array2::<f32>::zeros((3, 1));
        let joined = concat_features(&x, &loaded).unwrap();
        assert_eq!(joined.dim(), (3, 3));
        assert_eq!(joined[[2, 2]], 6.0);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_embedding(&embedding_path(dir.path(), "absent")).unwrap_err();
        assert!(matches!(err, Error::MissingResource { .. }));
    }

    #[test]
    fn test_row_mismatch() {
        let x = Array2::<f32>::zeros((4, 2));
        let emb = Array2::<f32>::zeros((3, 2));
        assert!(concat_features(&x, &emb).is_err());
    }
}
