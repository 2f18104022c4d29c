//! In-memory [`EvaluationSource`] for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{RulError, RulResult};
use crate::evaluation::{EvaluationSource, RawEvaluationRow};

/// Failure to inject into [`InMemoryEvaluationSource::fetch_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubFailure {
    /// Fail before a connection is acquired.
    Connect,
    /// Acquire a connection, then fail the query.
    Query,
}

/// Serves a fixed set of rows.
///
/// Each fetch "acquires" a connection through a guard, so tests can assert
/// that nothing stays checked out whatever the outcome.
#[derive(Debug, Default)]
pub struct InMemoryEvaluationSource {
    rows: Arc<RwLock<Vec<RawEvaluationRow>>>,
    failure: Option<StubFailure>,
    open: Arc<AtomicUsize>,
    acquisitions: AtomicUsize,
}

impl InMemoryEvaluationSource {
    pub fn new(rows: Vec<RawEvaluationRow>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            ..Self::default()
        }
    }

    pub fn with_failure(mut self, failure: StubFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Replace the stored rows.
    pub fn set_rows(&self, rows: Vec<RawEvaluationRow>) {
        if let Ok(mut guard) = self.rows.write() {
            *guard = rows;
        }
    }

    /// Connections currently checked out. Zero between calls.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Connections acquired over the lifetime of the source.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn acquire(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(open))
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EvaluationSource for InMemoryEvaluationSource {
    async fn fetch_rows(&self) -> RulResult<Vec<RawEvaluationRow>> {
        if self.failure == Some(StubFailure::Connect) {
            return Err(RulError::DatabaseConnection(
                "connection refused (stub)".to_string(),
            ));
        }

        let _conn = ConnectionGuard::acquire(&self.open);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        if self.failure == Some(StubFailure::Query) {
            return Err(RulError::Query("relation does not exist (stub)".to_string()));
        }

        let rows = self
            .rows
            .read()
            .map_err(|e| RulError::Query(format!("lock poisoned: {}", e)))?;
        Ok(rows.clone())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
