//! HTTP handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info, warn};

use rul_core::evaluation::DisplaySeries;
use rul_core::RulError;

use crate::response::{
    ApiError, DisplaySeriesEntry, EvaluationEntry, HealthResponse, PredictionResponse,
};
use crate::state::AppState;

/// `GET /api/data`: every decodable evaluation record, in store order.
pub async fn get_data(
    State(state): State<AppState>,
) -> Result<Json<Vec<EvaluationEntry>>, ApiError> {
    let records = state.store.fetch_all().await.map_err(ApiError::Dashboard)?;
    debug!(records = records.len(), "Serving evaluation data");
    Ok(Json(records.into_iter().map(EvaluationEntry::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub stride: Option<usize>,
}

/// `GET /api/series?stride=N`: records downsampled for display.
pub async fn get_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<DisplaySeriesEntry>>, ApiError> {
    let stride = query.stride.unwrap_or(state.default_stride);
    let records = state.store.fetch_all().await.map_err(ApiError::Dashboard)?;

    Ok(Json(
        records
            .iter()
            .map(|record| DisplaySeriesEntry::from(DisplaySeries::from_record(record, stride)))
            .collect(),
    ))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.engine.state(),
        message: state.engine.status_message(),
    })
}

/// Fields read from the prediction form.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Bytes>,
    model_name: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => form.file = Some(field.bytes().await.map_err(malformed_form)?),
            "model_name" => {
                let text = field.text().await.map_err(malformed_form)?;
                form.model_name = Some(text).filter(|s| !s.trim().is_empty());
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

fn malformed_form(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Prediction(RulError::UnparsableUpload(format!(
        "malformed multipart body: {}",
        e
    )))
}

/// `POST /api/rul`: predict RUL for an uploaded feature matrix.
///
/// The transient upload is removed before the response is built. If the
/// client goes away mid-request the upload guard is dropped with the
/// future and removes the file instead.
pub async fn predict_rul(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await?,
        Err(rejection) => {
            debug!("Request is not multipart: {}", rejection);
            UploadForm::default()
        }
    };

    let ingested = state
        .ingestor
        .ingest(form.file.as_deref())
        .await
        .map_err(ApiError::Prediction)?;
    let (upload, features) = ingested.into_parts();

    let engine = Arc::clone(&state.engine);
    let outcome = match tokio::task::spawn_blocking(move || engine.predict(&features)).await {
        Ok(result) => result,
        Err(e) => Err(RulError::InferenceFailure(format!("inference task failed: {}", e))),
    };

    if let Err(e) = upload.cleanup() {
        warn!(error = %e, "Transient upload left behind");
    }

    let result = outcome.map_err(ApiError::Prediction)?;

    let output_file_path = match &state.exporter {
        Some(exporter) => match exporter.export(form.model_name.as_deref(), &result).await {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => {
                warn!(error = %e, "Prediction export failed");
                None
            }
        },
        None => None,
    };

    info!(
        rows = result.values.len(),
        model_name = form.model_name.as_deref().unwrap_or("-"),
        "Prediction served"
    );

    Ok(Json(PredictionResponse {
        prediction: result.values,
        output_file_path,
    }))
}
