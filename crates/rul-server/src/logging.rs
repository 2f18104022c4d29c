//! Process-wide log subscriber.
//!
//! The subscriber is installed before configuration is read, so the
//! `DB_*` override logs emitted while loading config are kept. The
//! configured `logging.filter` is swapped in afterwards through a reload
//! handle. `RUST_LOG`, when set, wins over both.

use tracing::{debug, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Filter in effect until the configured one is applied.
pub const BOOTSTRAP_FILTER: &str = "info";

/// Swaps the active filter once configuration is known.
pub struct LogFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    pinned: bool,
}

impl LogFilter {
    /// Apply `logging.filter` from config. No-op when `RUST_LOG` was set.
    pub fn apply_configured(&self, directives: &str) {
        if self.pinned {
            debug!("RUST_LOG is set, ignoring logging.filter '{}'", directives);
            return;
        }
        if let Err(e) = self.handle.reload(EnvFilter::new(directives)) {
            warn!("Could not apply logging.filter '{}': {}", directives, e);
        }
    }
}

/// Build the subscriber without installing it.
///
/// `rust_log` is the filter parsed from `RUST_LOG`, if any.
pub fn build_subscriber<W>(
    rust_log: Option<EnvFilter>,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, LogFilter)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let pinned = rust_log.is_some();
    let (filter, handle) =
        reload::Layer::new(rust_log.unwrap_or_else(|| EnvFilter::new(BOOTSTRAP_FILTER)));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer));

    (subscriber, LogFilter { handle, pinned })
}

/// Install the global subscriber, writing to stdout.
pub fn init() -> LogFilter {
    let (subscriber, filter) =
        build_subscriber(EnvFilter::try_from_default_env().ok(), std::io::stdout);
    subscriber.init();
    filter
}
