//! Read access to a scenario's `main.db`.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;

use crate::error::MetricsError;
use crate::evenness::EdgeRecord;

/// Table holding the full (directed, possibly duplicated) network edge list.
pub const EDGES_TABLE: &str = "edges";

// Casts pin the runtime storage class so decoding does not depend on the
// column affinity the upstream writer happened to declare.
const SELECT_EDGES: &str = "SELECT \
        CAST(mode AS TEXT) AS mode, \
        CAST(mode_oid AS INTEGER) AS mode_oid, \
        CAST(capac_minus_volume_zero_floor AS REAL) AS capac_minus_volume_zero_floor, \
        CAST(volume AS REAL) AS volume, \
        CAST(length AS REAL) AS length \
    FROM edges";

/// Load every row of the `edges` table.
pub async fn load_edges(db_path: &Path) -> Result<Vec<EdgeRecord>, MetricsError> {
    if !db_path.is_file() {
        return Err(MetricsError::MissingDatabase(db_path.to_path_buf()));
    }
    let db_err = |source| MetricsError::Database {
        path: db_path.to_path_buf(),
        source,
    };

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(db_err)?;

    let rows = sqlx::query_as::<_, EdgeRecord>(SELECT_EDGES)
        .fetch_all(&pool)
        .await
        .map_err(db_err);
    pool.close().await;

    let rows = rows?;
    tracing::info!("loaded {} rows from {} in {}", rows.len(), EDGES_TABLE, db_path.display());
    Ok(rows)
}
