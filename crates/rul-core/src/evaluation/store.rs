//! Result store adapter.
//!
//! [`EvaluationSource`] is the seam to the relational store: it hands back
//! raw rows and owns connection handling. [`ResultStoreAdapter`] sits on top
//! and turns those rows into typed records with per-row failure isolation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::record::{decode_row, EvaluationRecord, RawEvaluationRow};
use crate::error::RulResult;

/// Source of persisted evaluation rows.
///
/// Implementations acquire a connection, run one read query and release
/// the connection before returning, on success and on failure alike.
#[async_trait]
pub trait EvaluationSource: Send + Sync {
    /// Fetch every evaluation row in store order.
    ///
    /// # Errors
    ///
    /// - `RulError::DatabaseConnection` if no connection can be acquired
    /// - `RulError::Query` if the read query fails
    async fn fetch_rows(&self) -> RulResult<Vec<RawEvaluationRow>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Outcome of a fetch, including rows that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub records: Vec<EvaluationRecord>,
    pub skipped: usize,
}

/// Fetches and decodes evaluation records.
#[derive(Clone)]
pub struct ResultStoreAdapter {
    source: Arc<dyn EvaluationSource>,
}

impl ResultStoreAdapter {
    pub fn new(source: Arc<dyn EvaluationSource>) -> Self {
        Self { source }
    }

    /// All decodable records, in store order.
    ///
    /// Malformed rows are logged and skipped; only connection and query
    /// failures fail the whole call.
    pub async fn fetch_all(&self) -> RulResult<Vec<EvaluationRecord>> {
        Ok(self.fetch_report().await?.records)
    }

    /// Like [`ResultStoreAdapter::fetch_all`], also reporting skipped rows.
    pub async fn fetch_report(&self) -> RulResult<FetchReport> {
        let started = Instant::now();
        let rows = self.source.fetch_rows().await?;
        let total = rows.len();

        let mut records = Vec::with_capacity(total);
        let mut skipped = 0;
        for raw in rows {
            match decode_row(raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Skipping malformed stored record");
                }
            }
        }

        debug!(
            backend = self.source.backend_name(),
            total,
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched evaluation records"
        );

        Ok(FetchReport { records, skipped })
    }
}

impl std::fmt::Debug for ResultStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStoreAdapter")
            .field("backend", &self.source.backend_name())
            .finish()
    }
}
