//! Network diversity metrics
//!
//! Computes Shannon-entropy evenness over a scenario's edge table for three
//! weighting bases (available capacity, volume, length). The computation is
//! pure ([`evenness_metrics`]); [`load_edges`] pulls the input out of a
//! scenario's SQLite database.

pub mod db;
pub mod error;
pub mod evenness;

pub use db::load_edges;
pub use error::MetricsError;
pub use evenness::{
    evenness_metrics, evenness_of, filter_edges, EdgeRecord, EvennessReport, EvennessRow,
    WeightBasis, DEFAULT_MODE,
};

use std::path::Path;

/// Load `edges` from `db_path` and compute the report for `mode`.
pub async fn evenness_from_db(db_path: &Path, mode: &str) -> Result<EvennessReport, MetricsError> {
    let edges = load_edges(db_path).await?;
    Ok(evenness_metrics(&edges, mode))
}
