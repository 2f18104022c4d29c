//! Inference Engine Adapter.
//!
//! # State machine
//!
//! ```text
//! Unloaded --load()--> Loading --ok--> Ready
//!                              \--err--> LoadFailed
//! ```
//!
//! `load` runs at most once. There is no reload path: a failed load stays
//! failed for the life of the process.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::model::RulModel;
use crate::error::{RulError, RulResult};
use crate::upload::UploadedFeatureSet;

/// Lifecycle of the single loaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Unloaded => "unloaded",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::LoadFailed => "loadfailed",
        }
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row per input row, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub values: Vec<Vec<f64>>,
}

/// Owns the model state cell and runs predictions against it.
///
/// After `Ready` the model is read through an `Arc` with no locking, so
/// any number of predictions can run concurrently.
#[derive(Debug, Default)]
pub struct InferenceEngine {
    loading: AtomicBool,
    slot: OnceLock<Result<Arc<RulModel>, String>>,
    forward_passes: AtomicU64,
}

impl InferenceEngine {
    /// An engine in the `Unloaded` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine already `Ready` with `model`.
    pub fn ready(model: RulModel) -> Self {
        let engine = Self::new();
        let _ = engine.slot.set(Ok(Arc::new(model)));
        engine
    }

    /// Load the artifact in `dir`. Blocking; call from a blocking context.
    ///
    /// Only the first call does any work. Concurrent or later calls return
    /// the current state without touching the filesystem.
    pub fn load(&self, dir: &Path) -> ModelState {
        info!("Loading RUL model artifact from {}", dir.display());
        self.load_with(|| RulModel::load(dir))
    }

    /// Run `loader` as the one-time load. A panic inside it counts as a
    /// failed load rather than leaving the engine in `Loading`.
    pub(crate) fn load_with<F>(&self, loader: F) -> ModelState
    where
        F: FnOnce() -> RulResult<RulModel>,
    {
        if self.slot.get().is_some()
            || self
                .loading
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            debug!("Model load already started, returning current state");
            return self.state();
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(loader)) {
            Ok(loaded) => loaded.map(Arc::new).map_err(|e| e.to_string()),
            Err(payload) => Err(format!("artifact loader panicked: {}", panic_text(&*payload))),
        };
        match &outcome {
            Ok(model) => info!(input_width = model.input_width(), "RUL model ready"),
            Err(message) => error!("RUL model failed to load: {}", message),
        }

        if self.slot.set(outcome).is_err() {
            warn!("Model state was set concurrently; keeping the first result");
        }
        self.state()
    }

    pub fn state(&self) -> ModelState {
        match self.slot.get() {
            Some(Ok(_)) => ModelState::Ready,
            Some(Err(_)) => ModelState::LoadFailed,
            None if self.loading.load(Ordering::Acquire) => ModelState::Loading,
            None => ModelState::Unloaded,
        }
    }

    /// Input width of the loaded model, if `Ready`.
    pub fn expected_width(&self) -> Option<usize> {
        self.model().map(|model| model.input_width())
    }

    /// Human-readable status, including the load error when `LoadFailed`.
    pub fn status_message(&self) -> String {
        match self.slot.get() {
            Some(Ok(model)) => format!("model ready (input_width={})", model.input_width()),
            Some(Err(message)) => format!("model failed to load: {}", message),
            None => format!("model {}", self.state()),
        }
    }

    /// Forward passes executed so far.
    pub fn forward_passes(&self) -> u64 {
        self.forward_passes.load(Ordering::Relaxed)
    }

    fn model(&self) -> Option<&Arc<RulModel>> {
        match self.slot.get() {
            Some(Ok(model)) => Some(model),
            _ => None,
        }
    }

    /// Run the model over `features`.
    ///
    /// # Errors
    ///
    /// - `ModelNotLoaded` unless the state is `Ready`
    /// - `ShapeMismatch` if the feature count differs from the model's
    ///   input width; no forward pass is run
    /// - `InferenceFailure` for any tensor error
    pub fn predict(&self, features: &UploadedFeatureSet) -> RulResult<PredictionResult> {
        let model = self
            .model()
            .ok_or_else(|| RulError::ModelNotLoaded(self.status_message()))?;

        if features.feature_count() != model.input_width() {
            return Err(RulError::ShapeMismatch {
                expected: model.input_width(),
                actual: features.feature_count(),
            });
        }

        self.forward_passes.fetch_add(1, Ordering::Relaxed);
        let values = model
            .forward_rows(&features.flatten(), features.feature_count())
            .map_err(|e| match e {
                RulError::InferenceFailure(_) => e,
                other => RulError::InferenceFailure(other.to_string()),
            })?;

        debug!(rows = values.len(), "Prediction complete");
        Ok(PredictionResult { values })
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
