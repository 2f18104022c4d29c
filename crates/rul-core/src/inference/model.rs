//! The loaded network.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use tracing::info;

use super::artifact::{ArtifactConfig, CONFIG_FILE, WEIGHTS_FILE};
use crate::error::{RulError, RulResult};

/// A dense regression network loaded from an artifact directory.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct RulModel {
    config: ArtifactConfig,
    layers: Vec<Linear>,
    device: Device,
}

impl RulModel {
    /// Load `config.json` and `model.safetensors` from `dir` onto the CPU.
    ///
    /// # Errors
    ///
    /// `RulError::ArtifactLoad` for a missing file, an invalid config or a
    /// tensor whose name or shape does not match the config.
    pub fn load(dir: &Path) -> RulResult<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            RulError::ArtifactLoad(format!("cannot read {}: {}", config_path.display(), e))
        })?;
        let config: ArtifactConfig = serde_json::from_str(&raw).map_err(|e| {
            RulError::ArtifactLoad(format!("invalid {}: {}", config_path.display(), e))
        })?;
        config.validate()?;

        let weights_path = dir.join(WEIGHTS_FILE);
        if !weights_path.exists() {
            return Err(RulError::ArtifactLoad(format!(
                "safetensors not found at {}",
                weights_path.display()
            )));
        }

        let device = Device::Cpu;
        // SAFETY: the artifact is read-only for the lifetime of the process.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device).map_err(
                |e| RulError::ArtifactLoad(format!("failed to load safetensors: {}", e)),
            )?
        };

        let layers = config
            .layer_dims()
            .into_iter()
            .enumerate()
            .map(|(i, (in_dim, out_dim))| {
                candle_nn::linear(in_dim, out_dim, vb.pp(format!("layers.{}", i))).map_err(|e| {
                    RulError::ArtifactLoad(format!(
                        "layer {} ({} -> {}): {}",
                        i, in_dim, out_dim, e
                    ))
                })
            })
            .collect::<RulResult<Vec<Linear>>>()?;

        info!(
            "RUL model loaded from {}: {} layers, input_width={}, output_width={}",
            dir.display(),
            layers.len(),
            config.input_width,
            config.output_width
        );

        Ok(Self {
            config,
            layers,
            device,
        })
    }

    /// Build from in-memory `(weight, bias)` pairs, checked against `config`.
    pub fn from_parts(config: ArtifactConfig, params: Vec<(Tensor, Tensor)>) -> RulResult<Self> {
        config.validate()?;
        let dims = config.layer_dims();
        if dims.len() != params.len() {
            return Err(RulError::ArtifactLoad(format!(
                "expected {} layers, got {}",
                dims.len(),
                params.len()
            )));
        }

        let mut layers = Vec::with_capacity(params.len());
        for (i, ((in_dim, out_dim), (weight, bias))) in dims.into_iter().zip(params).enumerate() {
            if weight.dims() != [out_dim, in_dim] || bias.dims() != [out_dim] {
                return Err(RulError::ArtifactLoad(format!(
                    "layer {}: expected weight [{}, {}] and bias [{}], got {:?} and {:?}",
                    i,
                    out_dim,
                    in_dim,
                    out_dim,
                    weight.dims(),
                    bias.dims()
                )));
            }
            let weight = weight
                .to_dtype(DType::F32)
                .map_err(|e| RulError::ArtifactLoad(e.to_string()))?;
            let bias = bias
                .to_dtype(DType::F32)
                .map_err(|e| RulError::ArtifactLoad(e.to_string()))?;
            layers.push(Linear::new(weight, Some(bias)));
        }

        Ok(Self {
            config,
            layers,
            device: Device::Cpu,
        })
    }

    /// Write this model as an artifact directory.
    pub fn save(&self, dir: &Path) -> RulResult<()> {
        std::fs::create_dir_all(dir)?;

        let config_json = serde_json::to_string_pretty(&self.config)
            .map_err(|e| RulError::ArtifactLoad(format!("cannot encode config: {}", e)))?;
        std::fs::write(dir.join(CONFIG_FILE), config_json)?;

        let mut tensors: HashMap<String, Tensor> = HashMap::new();
        for (i, layer) in self.layers.iter().enumerate() {
            tensors.insert(format!("layers.{}.weight", i), layer.weight().clone());
            if let Some(bias) = layer.bias() {
                tensors.insert(format!("layers.{}.bias", i), bias.clone());
            }
        }
        candle_core::safetensors::save(&tensors, dir.join(WEIGHTS_FILE))
            .map_err(|e| RulError::ArtifactLoad(format!("cannot write safetensors: {}", e)))
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    pub fn input_width(&self) -> usize {
        self.config.input_width
    }

    /// Run the network over a row-major matrix of `width` columns.
    ///
    /// Returns one output row per input row, in input order.
    pub fn forward_rows(&self, values: &[f64], width: usize) -> RulResult<Vec<Vec<f64>>> {
        if width == 0 || values.len() % width != 0 {
            return Err(RulError::InferenceFailure(format!(
                "{} values do not form rows of width {}",
                values.len(),
                width
            )));
        }
        let rows = values.len() / width;

        if let Some(i) = values
            .iter()
            .position(|v| !v.is_finite() || v.abs() > f32::MAX as f64)
        {
            return Err(RulError::InferenceFailure(format!(
                "input row {} column {} ({}) is outside the f32 range",
                i / width,
                i % width,
                values[i]
            )));
        }

        let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        let mut xs = Tensor::from_vec(data, (rows, width), &self.device)?;

        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i < last {
                xs = self.config.activation.apply(&xs)?;
            }
        }

        let output = xs.to_vec2::<f32>()?;
        if let Some((r, _)) = output
            .iter()
            .enumerate()
            .find(|(_, row)| row.iter().any(|v| !v.is_finite()))
        {
            return Err(RulError::InferenceFailure(format!(
                "output row {} is not finite",
                r
            )));
        }

        Ok(output
            .into_iter()
            .map(|row| row.into_iter().map(f64::from).collect())
            .collect())
    }
}
