//! Inference Engine Adapter.
//!
//! A single pretrained artifact is loaded once at startup into a
//! [`RulModel`] and served by the [`InferenceEngine`]. Predictions can be
//! written out by the [`PredictionExporter`].

mod artifact;
mod engine;
mod export;
mod model;

pub use artifact::{Activation, ArtifactConfig, CONFIG_FILE, WEIGHTS_FILE};
pub use engine::{InferenceEngine, ModelState, PredictionResult};
pub use export::PredictionExporter;
pub use model::RulModel;
