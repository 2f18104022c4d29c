//! Sub-configuration structures for the RUL dashboard service.
//!
//! This module contains the individual configuration structs that make up
//! the main `Config` structure. Every struct is `#[serde(default)]` so a
//! partial TOML file or a handful of environment variables is enough.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    pub bind_address: String,

    /// Listen port (default: 5001, the port the dashboard frontend expects)
    pub port: u16,

    /// Allow cross-origin requests from any origin (default: true)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5001,
            cors_permissive: true,
        }
    }
}

/// Relational store configuration.
///
/// The five connection fields mirror the `DB_*` environment variables,
/// which always override whatever the config file says.
///
/// # Example Configuration
///
/// ```toml
/// [database]
/// host = "db.internal"
/// port = 5432
/// name = "rul"
/// table = "trainning_data_results"
/// pool_size = 8
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,

    /// Table holding one evaluation row per model.
    pub table: String,

    /// Maximum pooled connections (default: 16)
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "myuser".to_string(),
            password: "mypassword".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            name: "mydatabase".to_string(),
            table: "trainning_data_results".to_string(),
            pool_size: 16,
        }
    }
}

/// Pretrained artifact location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing `config.json` and `model.safetensors`.
    pub artifact_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./models/rul"),
        }
    }
}

/// Upload handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory for request-scoped transient files.
    pub dir: PathBuf,

    /// Maximum accepted request body in bytes (default: 10MB)
    pub max_upload_bytes: usize,
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("rul-uploads")
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_upload_bytes: 10_485_760, // 10MB
        }
    }
}

/// Prediction export.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write prediction JSON files. Unset or `""` disables export.
    pub predictions_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            predictions_dir: Some(PathBuf::from("output_predictions")),
        }
    }
}

impl OutputConfig {
    /// Export directory, or `None` when unset or set to `""`.
    pub fn export_dir(&self) -> Option<&Path> {
        self.predictions_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Dashboard display settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Stride used by `/api/series` when the request does not give one.
    pub default_stride: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_stride: crate::evaluation::DEFAULT_STRIDE,
        }
    }
}
