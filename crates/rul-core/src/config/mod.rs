//! Configuration management for the RUL dashboard service.

mod sub_configs;


use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

use crate::error::{RulError, RulResult};

pub use sub_configs::{
    DatabaseConfig, DisplayConfig, LoggingConfig, ModelConfig, OutputConfig, ServerConfig,
    UploadConfig,
};

/// Environment variables that govern the store connection.
///
/// These are read after every other source and always win.
pub const STORE_ENV_VARS: [&str; 5] = ["DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT", "DB_NAME"];

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub upload: UploadConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{RUL_ENV}.toml (environment-specific)
    /// 3. Environment variables with RUL__ prefix (e.g. `RUL__SERVER__PORT`)
    /// 4. `DB_USER`, `DB_PASSWORD`, `DB_HOST`, `DB_PORT`, `DB_NAME`
    pub fn load() -> RulResult<Self> {
        let env = env::var("RUL_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("RUL")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Config = builder.build()?.try_deserialize()?;
        config.apply_store_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with every default, for tests and local development.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, then apply the `DB_*` overrides.
    pub fn from_file(path: &std::path::Path) -> RulResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RulError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| RulError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.apply_store_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DB_*` overrides from the process environment.
    pub fn apply_store_env(&mut self) -> RulResult<()> {
        self.apply_store_overrides(|key| env::var(key).ok())
    }

    /// Apply `DB_*` overrides from an arbitrary lookup.
    ///
    /// Split out from [`Config::apply_store_env`] so tests do not have to
    /// mutate the shared process environment.
    pub fn apply_store_overrides<F>(&mut self, lookup: F) -> RulResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;

        if let Some(user) = lookup("DB_USER") {
            info!("ENV override: database.user = {}", user);
            db.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            info!("ENV override: database.password = <redacted>");
            db.password = password;
        }
        if let Some(host) = lookup("DB_HOST") {
            info!("ENV override: database.host = {}", host);
            db.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            db.port = port.trim().parse::<u16>().map_err(|e| {
                RulError::ConfigError(format!("DB_PORT='{}' is not a valid port: {}", port, e))
            })?;
            info!("ENV override: database.port = {}", db.port);
        }
        if let Some(name) = lookup("DB_NAME") {
            info!("ENV override: database.name = {}", name);
            db.name = name;
        }

        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> RulResult<()> {
        if self.server.port == 0 {
            return Err(RulError::ConfigError(
                "server.port must be greater than 0".into(),
            ));
        }

        if self.database.host.trim().is_empty() {
            return Err(RulError::ConfigError("database.host must not be empty".into()));
        }

        if self.database.name.trim().is_empty() {
            return Err(RulError::ConfigError("database.name must not be empty".into()));
        }

        if self.database.pool_size == 0 {
            return Err(RulError::ConfigError(
                "database.pool_size must be greater than 0".into(),
            ));
        }

        if !is_plain_identifier(&self.database.table) {
            return Err(RulError::ConfigError(format!(
                "database.table '{}' must match [A-Za-z_][A-Za-z0-9_]*",
                self.database.table
            )));
        }

        if self.upload.max_upload_bytes == 0 {
            return Err(RulError::ConfigError(
                "upload.max_upload_bytes must be greater than 0".into(),
            ));
        }

        if self.display.default_stride == 0 {
            return Err(RulError::ConfigError(
                "display.default_stride must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// The table name is interpolated into SQL, so only bare identifiers pass.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
