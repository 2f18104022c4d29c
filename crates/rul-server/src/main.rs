//! RUL Dashboard Backend
//!
//! # Usage
//!
//! ```bash
//! # Defaults, config/default.toml and RUL__* / DB_* environment variables
//! rul-server
//!
//! # Explicit config file
//! rul-server --config /path/to/config.toml
//!
//! # Listen on all interfaces
//! rul-server --bind 0.0.0.0 --port 5001
//!
//! # Debug logging
//! RUST_LOG=debug rul-server
//! ```
//!
//! # CLI Argument Priority
//!
//! CLI arguments > Environment variables > Config file > Defaults

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use rul_core::Config;
use rul_server::{logging, RulServer};

// ============================================================================
// CLI Argument Parsing
// ============================================================================

struct CliArgs {
    /// Path to configuration file
    config_path: Option<PathBuf>,
    /// Listen port override (--port)
    port: Option<u16>,
    /// Bind address override (--bind)
    bind_address: Option<String>,
    help: bool,
}

impl CliArgs {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut cli = CliArgs {
            config_path: None,
            port: None,
            bind_address: None,
            help: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => {
                    cli.help = true;
                }
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        cli.config_path = Some(PathBuf::from(&args[i]));
                    }
                }
                "--port" => {
                    i += 1;
                    if i < args.len() {
                        if let Ok(port) = args[i].parse::<u16>() {
                            cli.port = Some(port);
                        }
                    }
                }
                "--bind" => {
                    i += 1;
                    if i < args.len() {
                        cli.bind_address = Some(args[i].clone());
                    }
                }
                _ => {} // Ignore unknown arguments
            }
            i += 1;
        }

        cli
    }
}

fn print_help() {
    eprintln!(
        r#"RUL Dashboard Backend

USAGE:
    rul-server [OPTIONS]

OPTIONS:
    --config <PATH>      Path to configuration file (default: config/default.toml + config/$RUL_ENV.toml)
    --bind <ADDRESS>     Bind address (default: 127.0.0.1)
    --port <PORT>        Listen port (default: 5001)
    --help, -h           Show this help message

ENVIRONMENT VARIABLES:
    DB_USER, DB_PASSWORD, DB_HOST, DB_PORT, DB_NAME
                         Store connection; always override the config file
    RUL_ENV              Selects config/<RUL_ENV>.toml (default: development)
    RUL__<SECTION>__<KEY>
                         Any config value, e.g. RUL__MODEL__ARTIFACT_DIR
    RUST_LOG             Log filter (error, warn, info, debug, trace)

ROUTES:
    GET  /api/data       Evaluation records
    GET  /api/series     Records downsampled for display (?stride=N)
    POST /api/rul        Multipart upload (file, model_name) -> predictions
    GET  /api/health     Liveness and model state
"#
    );
}

fn apply_overrides(config: &mut Config, cli: &CliArgs) {
    if let Some(port) = cli.port {
        info!("CLI override: server.port = {}", port);
        config.server.port = port;
    }
    if let Some(ref bind) = cli.bind_address {
        info!("CLI override: server.bind_address = {}", bind);
        config.server.bind_address = bind.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    if cli.help {
        print_help();
        return Ok(());
    }

    // Before config, so DB_* override logs are not lost
    let log_filter = logging::init();
    info!("RUL dashboard backend starting...");

    let mut config = match cli.config_path {
        Some(ref path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    log_filter.apply_configured(&config.logging.filter);

    if let Some(ref path) = cli.config_path {
        info!("Configuration loaded from: {:?}", path);
    }

    apply_overrides(&mut config, &cli);
    config.validate()?;

    info!(
        "Store: {}@{}:{}/{} table={}",
        config.database.user,
        config.database.host,
        config.database.port,
        config.database.name,
        config.database.table
    );

    let server = RulServer::new(config).await?;
    server.run().await
}
