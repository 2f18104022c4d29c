//! End-to-end tests for the HTTP surface, driven through `oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rul_core::evaluation::{RawEvaluationRow, ResultStoreAdapter, StoredColumn};
use rul_core::inference::{
    Activation, ArtifactConfig, InferenceEngine, PredictionExporter, RulModel,
};
use rul_core::stubs::{write_dense_artifact, InMemoryEvaluationSource, StubFailure};
use rul_core::upload::UploadIngestor;
use rul_core::Config;
use rul_server::{create_router, AppState};

const BOUNDARY: &str = "rul-test-boundary";

struct Harness {
    router: Router,
    engine: Arc<InferenceEngine>,
    uploads: TempDir,
    outputs: TempDir,
    _artifact: TempDir,
}

fn lstm_row() -> RawEvaluationRow {
    RawEvaluationRow {
        model: Some("LSTM".to_string()),
        calculations: StoredColumn::Text(r#"{"Accuracy":"0.91","RMSE":"0.12"}"#.to_string()),
        predictions: StoredColumn::Structured(json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10])),
    }
}

/// Model: `y = x0 + 2*x1 + 3*x2 + 0.5`.
fn ready_engine(artifact: &Path) -> InferenceEngine {
    let config = ArtifactConfig {
        input_width: 3,
        hidden_sizes: vec![],
        output_width: 1,
        activation: Activation::Relu,
    };
    write_dense_artifact(artifact, config, &[(vec![vec![1.0, 2.0, 3.0]], vec![0.5])]).unwrap();
    InferenceEngine::ready(RulModel::load(artifact).unwrap())
}

fn harness_with(source: InMemoryEvaluationSource, engine: InferenceEngine) -> Harness {
    let uploads = TempDir::new().unwrap();
    let outputs = TempDir::new().unwrap();
    let engine = Arc::new(engine);

    let state = AppState::new(
        Arc::new(ResultStoreAdapter::new(Arc::new(source))),
        Arc::clone(&engine),
        Arc::new(UploadIngestor::new(uploads.path()).unwrap()),
    )
    .with_exporter(PredictionExporter::new(outputs.path()));

    Harness {
        router: create_router(state, &Config::default_config()),
        engine,
        uploads,
        outputs,
        _artifact: TempDir::new().unwrap(),
    }
}

fn harness() -> Harness {
    let artifact = TempDir::new().unwrap();
    let engine = ready_engine(artifact.path());
    let mut h = harness_with(InMemoryEvaluationSource::new(vec![lstm_row()]), engine);
    h._artifact = artifact;
    h
}

fn multipart_body(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        if *name == "file" {
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"file\"; filename=\"features.json\"\r\n\
                  Content-Type: application/octet-stream\r\n\r\n",
            );
        } else {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn rul_request(parts: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/rul")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn floats(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// ============================================================================
// GET /api/data and /api/series
// ============================================================================

#[tokio::test]
async fn test_data_returns_lstm_record() {
    let h = harness();

    let (status, body) = send(&h.router, get("/api/data")).await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["model"], "LSTM");
    assert_eq!(
        records[0]["calculations"],
        json!({"Accuracy": "0.91", "RMSE": "0.12"})
    );
    assert_eq!(
        floats(&records[0]["predictions"]),
        (1..=10).map(f64::from).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_data_store_failure_is_generic_500() {
    let h = harness_with(
        InMemoryEvaluationSource::new(vec![]).with_failure(StubFailure::Connect),
        InferenceEngine::new(),
    );

    let (status, body) = send(&h.router, get("/api/data")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch data"}));
}

#[tokio::test]
async fn test_data_skips_malformed_rows() {
    let broken = RawEvaluationRow {
        model: Some("GRU".to_string()),
        calculations: StoredColumn::Text("{oops".to_string()),
        predictions: StoredColumn::Structured(json!([1])),
    };
    let h = harness_with(
        InMemoryEvaluationSource::new(vec![broken, lstm_row()]),
        InferenceEngine::new(),
    );

    let (status, body) = send(&h.router, get("/api/data")).await;

    assert_eq!(status, StatusCode::OK);
    let models: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["model"].as_str().unwrap())
        .collect();
    assert_eq!(models, ["LSTM"]);
}

#[tokio::test]
async fn test_series_downsamples_with_default_stride() {
    let h = harness();

    let (status, body) = send(&h.router, get("/api/series")).await;

    assert_eq!(status, StatusCode::OK);
    let entry = &body[0];
    assert_eq!(entry["model"], "LSTM");
    let points: Vec<(u64, f64)> = entry["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["index"].as_u64().unwrap(), p["value"].as_f64().unwrap()))
        .collect();
    assert_eq!(points, vec![(1, 1.0), (2, 6.0)]);
    assert_eq!(entry["formatted"], json!({"Accuracy": "91.00%", "RMSE": "0.1200"}));
}

#[tokio::test]
async fn test_series_honours_stride_parameter() {
    let h = harness();

    let (_, body) = send(&h.router, get("/api/series?stride=3")).await;

    let values: Vec<f64> = body[0]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![1.0, 4.0, 7.0, 10.0]);
}

// ============================================================================
// POST /api/rul
// ============================================================================

#[tokio::test]
async fn test_predict_returns_predictions_and_export_path() {
    let h = harness();
    let doc = r#"{"data": [[1, 1, 1], [0, 0, 2], [10, 0, 0]], "features": 3}"#;

    let (status, body) = send(
        &h.router,
        rul_request(&[("model_name", "LSTM"), ("file", doc)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let rows: Vec<Vec<f64>> = body["prediction"].as_array().unwrap().iter().map(floats).collect();
    assert_eq!(rows, vec![vec![6.5], vec![6.5], vec![10.5]]);

    let exported = Path::new(body["output_file_path"].as_str().unwrap());
    assert!(exported.starts_with(h.outputs.path()));
    assert!(exported
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("lstm_prediction_"));
    let written: Value = serde_json::from_slice(&std::fs::read(exported).unwrap()).unwrap();
    assert_eq!(written["predictions"].as_array().unwrap().len(), 3);

    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test]
async fn test_predict_accepts_text_matrix() {
    let h = harness();

    let (status, body) = send(&h.router, rul_request(&[("file", "1 1 1\n2 0 0\n")])).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(floats(&body["prediction"][1]), vec![2.5]);
    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test]
async fn test_missing_file_part_is_400() {
    let h = harness();

    let (status, body) = send(&h.router, rul_request(&[("model_name", "LSTM")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No file uploaded"}));
    assert!(dir_is_empty(h.uploads.path()));
    assert_eq!(h.engine.forward_passes(), 0);
}

#[tokio::test]
async fn test_non_multipart_request_is_400() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/rul")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"data": [[1, 2, 3]], "features": 3}"#))
        .unwrap();

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_declared_shape_mismatch_never_reaches_engine() {
    let h = harness();
    let doc = r#"{"data": [[1, 2], [3, 4]], "features": 3}"#;

    let (status, body) = send(&h.router, rul_request(&[("file", doc)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error processing the file");
    assert!(body["details"].as_str().unwrap().contains("Shape mismatch"));
    assert_eq!(h.engine.forward_passes(), 0);
    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test]
async fn test_width_differing_from_model_never_reaches_engine() {
    let h = harness();
    let doc = r#"{"data": [[1, 2, 3, 4]], "features": 4}"#;

    let (status, body) = send(&h.router, rul_request(&[("file", doc)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("expected 3"));
    assert_eq!(h.engine.forward_passes(), 0);
    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test]
async fn test_unparsable_upload_is_500_with_details() {
    let h = harness();

    let (status, body) = send(&h.router, rul_request(&[("file", r#"{"data": 12}"#)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error processing the file");
    assert!(body["details"].is_string());
    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test]
async fn test_out_of_range_features_fail_without_null_predictions() {
    let h = harness();
    let doc = r#"{"data": [[1e300, 0, 0]], "features": 3}"#;

    let (status, body) = send(&h.router, rul_request(&[("file", doc)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body, json!({"error": "Error processing the file"}));
    assert!(dir_is_empty(h.uploads.path()));
    assert!(dir_is_empty(h.outputs.path()));
}

#[tokio::test]
async fn test_unloaded_model_hides_details() {
    let h = harness_with(InMemoryEvaluationSource::new(vec![]), InferenceEngine::new());
    let doc = r#"{"data": [[1, 2, 3]], "features": 3}"#;

    let (status, body) = send(&h.router, rul_request(&[("file", doc)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Error processing the file"}));
    assert!(dir_is_empty(h.uploads.path()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_match_sequential() {
    let h = harness();
    let docs: Vec<String> = (0..12)
        .map(|k| format!(r#"{{"data": [[{k}, 1, 0], [0, {k}, 1]], "features": 3}}"#))
        .collect();

    let mut sequential = Vec::new();
    for doc in &docs {
        let (status, body) = send(&h.router, rul_request(&[("file", doc.as_str())])).await;
        assert_eq!(status, StatusCode::OK);
        sequential.push(body["prediction"].clone());
    }

    let handles: Vec<_> = docs
        .into_iter()
        .map(|doc| {
            let router = h.router.clone();
            tokio::spawn(async move {
                let (_, body) = send(&router, rul_request(&[("file", doc.as_str())])).await;
                body["prediction"].clone()
            })
        })
        .collect();

    let mut concurrent = Vec::new();
    for handle in handles {
        concurrent.push(handle.await.unwrap());
    }

    assert_eq!(concurrent, sequential);
    assert!(dir_is_empty(h.uploads.path()));
}

// ============================================================================
// Health and CORS
// ============================================================================

#[tokio::test]
async fn test_health_reports_model_state() {
    let h = harness();
    let (status, body) = send(&h.router, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "ready");

    let cold = harness_with(InMemoryEvaluationSource::new(vec![]), InferenceEngine::new());
    let (_, body) = send(&cold.router, get("/api/health")).await;
    assert_eq!(body["model"], "unloaded");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let h = harness();
    let request = Request::builder()
        .uri("/api/data")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
