//! PostgreSQL-backed [`EvaluationSource`].
//!
//! Connections come from a `deadpool-postgres` pool. A pooled client is a
//! guard object: it goes back to the pool when dropped, so every exit path
//! of [`PgEvaluationSource::fetch_rows`] releases it.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use super::record::{RawEvaluationRow, StoredColumn};
use super::store::EvaluationSource;
use crate::config::DatabaseConfig;
use crate::error::{RulError, RulResult};

/// Upper bound on connecting and on waiting for a pooled connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Evaluation rows read from a PostgreSQL table.
pub struct PgEvaluationSource {
    pool: Pool,
    query: String,
}

impl PgEvaluationSource {
    /// Build the pool. No connection is opened until the first fetch.
    ///
    /// # Errors
    ///
    /// `RulError::DatabaseConnection` if the pool configuration is rejected.
    pub fn new(db: &DatabaseConfig) -> RulResult<Self> {
        let mut cfg = deadpool_postgres::Config::new();
        cfg.user = Some(db.user.clone());
        cfg.password = Some(db.password.clone());
        cfg.host = Some(db.host.clone());
        cfg.port = Some(db.port);
        cfg.dbname = Some(db.name.clone());
        cfg.connect_timeout = Some(CONNECT_TIMEOUT);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(db.pool_size);
        pool_cfg.timeouts.wait = Some(CONNECT_TIMEOUT);
        pool_cfg.timeouts.create = Some(CONNECT_TIMEOUT);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| RulError::DatabaseConnection(format!("failed to create pool: {}", e)))?;

        info!(
            "PostgreSQL pool configured for {}@{}:{}/{} (max_size={})",
            db.user, db.host, db.port, db.name, db.pool_size
        );

        Ok(Self {
            pool,
            query: format!(
                "SELECT model, calculations, predictions FROM \"{}\"",
                db.table
            ),
        })
    }

    /// Acquire a connection and run a trivial query.
    pub async fn check_connection(&self) -> RulResult<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RulError::DatabaseConnection(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| RulError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EvaluationSource for PgEvaluationSource {
    async fn fetch_rows(&self) -> RulResult<Vec<RawEvaluationRow>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RulError::DatabaseConnection(e.to_string()))?;

        let rows = client
            .query(self.query.as_str(), &[])
            .await
            .map_err(|e| RulError::Query(e.to_string()))?;

        debug!(rows = rows.len(), "Evaluation query returned");
        Ok(rows.iter().map(raw_row).collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn raw_row(row: &Row) -> RawEvaluationRow {
    RawEvaluationRow {
        model: row.try_get::<_, Option<String>>(0).ok().flatten(),
        calculations: stored_column(row, 1),
        predictions: stored_column(row, 2),
    }
}

/// Read a structured column whatever its declared SQL type.
fn stored_column(row: &Row, idx: usize) -> StoredColumn {
    let ty = row.columns()[idx].type_().clone();

    let read = if ty == Type::JSON || ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)
            .map(|v| v.map(StoredColumn::Structured))
    } else if ty == Type::TEXT || ty == Type::VARCHAR || ty == Type::BPCHAR || ty == Type::NAME {
        row.try_get::<_, Option<String>>(idx)
            .map(|v| v.map(StoredColumn::Text))
    } else if ty == Type::FLOAT8_ARRAY {
        row.try_get::<_, Option<Vec<f64>>>(idx)
            .map(|v| v.map(|values| StoredColumn::Structured(serde_json::json!(values))))
    } else if ty == Type::FLOAT4_ARRAY {
        row.try_get::<_, Option<Vec<f32>>>(idx)
            .map(|v| v.map(|values| StoredColumn::Structured(serde_json::json!(values))))
    } else {
        return StoredColumn::Unsupported(ty.name().to_string());
    };

    match read {
        Ok(Some(column)) => column,
        Ok(None) => StoredColumn::Null,
        Err(e) => StoredColumn::Unsupported(format!("{} ({})", ty.name(), e)),
    }
}
