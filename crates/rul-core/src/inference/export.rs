//! Prediction export to JSON files.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::engine::PredictionResult;
use crate::error::{RulError, RulResult};

/// Slug used when the request names no model.
const DEFAULT_SLUG: &str = "model";

/// Writes each prediction to its own file under a fixed directory.
#[derive(Debug, Clone)]
pub struct PredictionExporter {
    dir: PathBuf,
}

impl PredictionExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `{"predictions": [[..], ..]}` and return the file path.
    ///
    /// Files are named `<model-slug>_prediction_<YYYYmmdd_HHMMSS>_<id>.json`;
    /// the short id keeps two exports in the same second apart.
    pub async fn export(
        &self,
        model_name: Option<&str>,
        result: &PredictionResult,
    ) -> RulResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RulError::Io(format!(
                "failed to create output dir {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let id = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}_prediction_{}_{}.json",
            model_slug(model_name),
            Local::now().format("%Y%m%d_%H%M%S"),
            &id[..8]
        );
        let path = self.dir.join(file_name);

        let body = serde_json::to_vec_pretty(&json!({ "predictions": result.values }))
            .map_err(|e| RulError::Io(format!("failed to encode predictions: {}", e)))?;
        tokio::fs::write(&path, body).await.map_err(|e| {
            RulError::Io(format!("failed to write {}: {}", path.display(), e))
        })?;

        info!("Predictions exported to {}", path.display());
        Ok(path)
    }
}

/// Lowercase, spaces to underscores, anything else non-alphanumeric dropped.
fn model_slug(model_name: Option<&str>) -> String {
    let slug: String = model_name
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}
