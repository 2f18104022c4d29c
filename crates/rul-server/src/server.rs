//! Server bootstrap: build resources from config, bind, serve.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use rul_core::evaluation::{PgEvaluationSource, ResultStoreAdapter};
use rul_core::inference::{InferenceEngine, ModelState, PredictionExporter};
use rul_core::upload::UploadIngestor;
use rul_core::Config;

use crate::router::create_router;
use crate::state::AppState;

/// The RUL dashboard HTTP server.
pub struct RulServer {
    config: Config,
    state: AppState,
}

impl RulServer {
    /// Build every shared resource.
    ///
    /// An unreachable database or a broken artifact is logged, not fatal:
    /// the dashboard and prediction paths fail independently at request time.
    pub async fn new(config: Config) -> Result<Self> {
        let source = PgEvaluationSource::new(&config.database)
            .context("failed to configure the evaluation store")?;
        match source.check_connection().await {
            Ok(()) => info!("Evaluation store reachable"),
            Err(e) => warn!(error = %e, "Evaluation store not reachable at startup"),
        }
        let store = Arc::new(ResultStoreAdapter::new(Arc::new(source)));

        let ingestor = Arc::new(
            UploadIngestor::new(config.upload.dir.clone())
                .context("failed to prepare the upload directory")?,
        );
        info!("Uploads stored under {}", ingestor.dir().display());

        let engine = Arc::new(InferenceEngine::new());
        let artifact_dir = config.model.artifact_dir.clone();
        let loader = Arc::clone(&engine);
        let model_state = tokio::task::spawn_blocking(move || loader.load(&artifact_dir))
            .await
            .context("model loading task panicked")?;
        if model_state != ModelState::Ready {
            error!(
                "Prediction endpoint unavailable: {}",
                engine.status_message()
            );
        }

        let mut state = AppState::new(store, engine, ingestor)
            .with_default_stride(config.display.default_stride);
        match config.output.export_dir() {
            Some(dir) => {
                info!("Predictions exported to {}", dir.display());
                state = state.with_exporter(PredictionExporter::new(dir));
            }
            None => info!("Prediction export disabled"),
        }

        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        )
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                self.config.server.bind_address, self.config.server.port
            )
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("RUL dashboard backend listening on http://{}", addr);

        let router = create_router(self.state, &self.config);
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}
