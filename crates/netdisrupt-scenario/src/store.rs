//! The persisted edge-cost table of a scenario (`main.db`).

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ScenarioError;

pub const EDGE_COSTS_TABLE: &str = "networkx_edge_costs";

/// Route cost written to disabled edges; far above any real edge cost.
pub const DEFAULT_SENTINEL_COST: f64 = 99_999.0;

/// How long a statement waits on another writer before failing as busy.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Primary result codes; extended codes carry them in the low byte.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

pub struct EdgeCostStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl EdgeCostStore {
    /// Open an existing database; never creates one.
    pub async fn open(path: &Path) -> Result<Self, ScenarioError> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Like [`EdgeCostStore::open`], waiting at most `busy_timeout` on a locked database.
    pub async fn open_with_busy_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, ScenarioError> {
        if !path.is_file() {
            return Err(ScenarioError::fs(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "scenario database not found"),
            ));
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .busy_timeout(busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| storage_error(path, e))?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `route_cost = sentinel` for every listed edge in one statement.
    ///
    /// Returns the number of rows updated.
    pub async fn disable_edges(&self, edge_ids: &[i64], sentinel: f64) -> Result<u64, ScenarioError> {
        if edge_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; edge_ids.len()].join(", ");
        let sql = format!(
            "UPDATE {EDGE_COSTS_TABLE} SET route_cost = ? WHERE edge_id IN ({placeholders})"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        let mut query = sqlx::query(&sql).bind(sentinel);
        for id in edge_ids {
            query = query.bind(*id);
        }
        let result = query
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        tx.commit().await.map_err(|e| storage_error(&self.path, e))?;

        Ok(result.rows_affected())
    }

    /// Current route cost of one edge, if present.
    pub async fn route_cost(&self, edge_id: i64) -> Result<Option<f64>, ScenarioError> {
        let sql = format!("SELECT CAST(route_cost AS REAL) FROM {EDGE_COSTS_TABLE} WHERE edge_id = ?");
        sqlx::query_scalar::<_, f64>(&sql)
            .bind(edge_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(&self.path, e))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|c| c.parse::<i64>().ok())
            .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

fn storage_error(path: &Path, source: sqlx::Error) -> ScenarioError {
    let path = path.to_path_buf();
    if is_busy(&source) {
        ScenarioError::TransientStorage { path, source }
    } else {
        ScenarioError::Storage { path, source }
    }
}
