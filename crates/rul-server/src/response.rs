//! Response Builder: JSON shapes and error-to-status mapping.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use rul_core::evaluation::{DisplaySeries, EvaluationRecord, MetricValue, SeriesPoint};
use rul_core::inference::ModelState;
use rul_core::{ErrorClass, RulError};

/// Client message for any dashboard failure.
pub const FETCH_FAILED: &str = "Failed to fetch data";
/// Client message for any prediction failure other than a missing file.
pub const PROCESSING_FAILED: &str = "Error processing the file";

// ============================================================================
// Success bodies
// ============================================================================

/// One element of the `GET /api/data` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationEntry {
    pub model: String,
    pub calculations: BTreeMap<String, MetricValue>,
    pub predictions: Vec<f64>,
}

impl From<EvaluationRecord> for EvaluationEntry {
    fn from(record: EvaluationRecord) -> Self {
        Self {
            model: record.model_name,
            calculations: record.calculations,
            predictions: record.predictions,
        }
    }
}

/// Body of a successful `POST /api/rul`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_path: Option<String>,
}

/// One element of the `GET /api/series` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySeriesEntry {
    pub model: String,
    pub points: Vec<SeriesPoint>,
    pub calculations: BTreeMap<String, MetricValue>,
    /// Calculations rendered for display (`"91.00%"`, `"0.1200"`).
    pub formatted: BTreeMap<String, String>,
}

impl From<DisplaySeries> for DisplaySeriesEntry {
    fn from(series: DisplaySeries) -> Self {
        let formatted = series.formatted_calculations();
        Self {
            model: series.model_name,
            points: series.points,
            calculations: series.calculations,
            formatted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: ModelState,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// A failed request, tagged with the path it failed on.
#[derive(Debug)]
pub enum ApiError {
    /// `GET /api/data` and `GET /api/series`.
    Dashboard(RulError),
    /// `POST /api/rul`.
    Prediction(RulError),
}

impl ApiError {
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Dashboard(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: FETCH_FAILED,
                    details: None,
                },
            ),
            ApiError::Prediction(RulError::NoFileUploaded) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "No file uploaded",
                    details: None,
                },
            ),
            ApiError::Prediction(e) if e.is_validation() => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: PROCESSING_FAILED,
                    details: Some(e.to_string()),
                },
            ),
            ApiError::Prediction(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: PROCESSING_FAILED,
                    details: None,
                },
            ),
        }
    }

    fn inner(&self) -> &RulError {
        match self {
            ApiError::Dashboard(e) | ApiError::Prediction(e) => e,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        let err = self.inner();
        match err.class() {
            ErrorClass::Validation => {
                warn!(status = status.as_u16(), error = %err, "Request rejected")
            }
            _ => error!(status = status.as_u16(), error = %err, "Request failed"),
        }
        (status, Json(body)).into_response()
    }
}
