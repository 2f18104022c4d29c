//! On-disk artifact description.
//!
//! An artifact is a directory holding two files:
//!
//! - `config.json`: the [`ArtifactConfig`] below
//! - `model.safetensors`: `layers.{i}.weight` as `[out, in]` and
//!   `layers.{i}.bias` as `[out]` for each dense layer, in order
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "input_width": 24,
//!   "hidden_sizes": [64, 32],
//!   "output_width": 1,
//!   "activation": "relu"
//! }
//! ```

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{RulError, RulResult};

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Activation applied after every layer except the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
    Identity,
}

impl Activation {
    pub fn apply(self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::Relu => xs.relu(),
            Activation::Tanh => xs.tanh(),
            Activation::Sigmoid => candle_nn::ops::sigmoid(xs),
            Activation::Identity => Ok(xs.clone()),
        }
    }
}

/// Shape of a dense regression network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Features per input row.
    pub input_width: usize,

    #[serde(default)]
    pub hidden_sizes: Vec<usize>,

    /// Values per output row (default: 1, the RUL estimate).
    #[serde(default = "default_output_width")]
    pub output_width: usize,

    #[serde(default)]
    pub activation: Activation,
}

fn default_output_width() -> usize {
    1
}

impl ArtifactConfig {
    pub fn validate(&self) -> RulResult<()> {
        if self.input_width == 0 {
            return Err(RulError::ArtifactLoad(
                "input_width must be greater than 0".to_string(),
            ));
        }
        if self.output_width == 0 {
            return Err(RulError::ArtifactLoad(
                "output_width must be greater than 0".to_string(),
            ));
        }
        if let Some(i) = self.hidden_sizes.iter().position(|&size| size == 0) {
            return Err(RulError::ArtifactLoad(format!(
                "hidden_sizes[{}] must be greater than 0",
                i
            )));
        }
        Ok(())
    }

    /// `(in, out)` per layer, input layer first.
    pub fn layer_dims(&self) -> Vec<(usize, usize)> {
        let widths: Vec<usize> = std::iter::once(self.input_width)
            .chain(self.hidden_sizes.iter().copied())
            .chain(std::iter::once(self.output_width))
            .collect();
        widths.windows(2).map(|pair| (pair[0], pair[1])).collect()
    }
}
