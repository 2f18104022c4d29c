//! Router assembly.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rul_core::Config;

use crate::handlers;
use crate::state::AppState;

/// Build the application router.
///
/// # Routes
///
/// - `GET /api/data` - evaluation records
/// - `GET /api/series` - records downsampled for display
/// - `POST /api/rul` - multipart upload, returns predictions
/// - `GET /api/health` - liveness and model state
pub fn create_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/api/data", get(handlers::get_data))
        .route("/api/series", get(handlers::get_series))
        .route("/api/rul", post(handlers::predict_rul))
        .route("/api/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.upload.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    let router = if config.server.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}
