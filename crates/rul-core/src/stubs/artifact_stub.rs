//! Artifact writer for tests.

use std::path::Path;

use candle_core::{Device, Tensor};

use crate::error::{RulError, RulResult};
use crate::inference::{ArtifactConfig, RulModel};

/// Write an artifact directory from plain weight matrices.
///
/// `layers[i]` is `(weight, bias)` with `weight` given row by row as
/// `[out][in]`.
pub fn write_dense_artifact(
    dir: &Path,
    config: ArtifactConfig,
    layers: &[(Vec<Vec<f32>>, Vec<f32>)],
) -> RulResult<()> {
    let params = layers
        .iter()
        .map(|(weight, bias)| {
            let out_dim = weight.len();
            let in_dim = weight.first().map(Vec::len).unwrap_or(0);
            let flat: Vec<f32> = weight.iter().flatten().copied().collect();
            if flat.len() != out_dim * in_dim {
                return Err(RulError::ArtifactLoad("ragged weight matrix".to_string()));
            }
            let weight = Tensor::from_vec(flat, (out_dim, in_dim), &Device::Cpu)?;
            let bias = Tensor::from_vec(bias.clone(), bias.len(), &Device::Cpu)?;
            Ok((weight, bias))
        })
        .collect::<RulResult<Vec<_>>>()?;

    RulModel::from_parts(config, params)?.save(dir)
}
