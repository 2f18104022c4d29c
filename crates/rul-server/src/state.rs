//! Shared handler state.

use std::sync::Arc;

use rul_core::evaluation::{ResultStoreAdapter, DEFAULT_STRIDE};
use rul_core::inference::{InferenceEngine, PredictionExporter};
use rul_core::upload::UploadIngestor;

/// Resources built once at startup and handed to every handler through
/// `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResultStoreAdapter>,
    pub engine: Arc<InferenceEngine>,
    pub ingestor: Arc<UploadIngestor>,
    /// `None` disables prediction export.
    pub exporter: Option<Arc<PredictionExporter>>,
    /// Stride for `/api/series` when the request gives none.
    pub default_stride: usize,
}

impl AppState {
    pub fn new(
        store: Arc<ResultStoreAdapter>,
        engine: Arc<InferenceEngine>,
        ingestor: Arc<UploadIngestor>,
    ) -> Self {
        Self {
            store,
            engine,
            ingestor,
            exporter: None,
            default_stride: DEFAULT_STRIDE,
        }
    }

    pub fn with_exporter(mut self, exporter: PredictionExporter) -> Self {
        self.exporter = Some(Arc::new(exporter));
        self
    }

    pub fn with_default_stride(mut self, stride: usize) -> Self {
        self.default_stride = stride;
        self
    }
}
