use approx::assert_relative_eq;
use netdisrupt_metrics::{evenness_from_db, load_edges, MetricsError, WeightBasis};
use proptest::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tempfile::tempdir;

async fn seed_edges(path: &Path, rows: &[(&str, i64, f64, f64, f64)]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE edges (edge_id INTEGER PRIMARY KEY, mode TEXT, mode_oid INTEGER, \
         capac_minus_volume_zero_floor REAL, volume REAL, length REAL)",
    )
    .execute(&pool)
    .await
    .unwrap();
    for (mode, oid, capac, vol, len) in rows {
        sqlx::query(
            "INSERT INTO edges (mode, mode_oid, capac_minus_volume_zero_floor, volume, length) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(*mode)
        .bind(*oid)
        .bind(*capac)
        .bind(*vol)
        .bind(*len)
        .execute(&pool)
        .await
        .unwrap();
    }
    pool.close().await;
}

#[tokio::test]
async fn reads_edges_table_and_computes_report() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("main.db");
    seed_edges(
        &db,
        &[
            ("road", 10, 5.0, 2.0, 1.0),
            // reverse direction of the same undirected edge
            ("road", 10, 5.0, 2.0, 1.0),
            ("road", 11, 5.0, 2.0, 1.0),
            ("water", 12, 100.0, 100.0, 100.0),
        ],
    )
    .await;

    let edges = load_edges(&db).await.unwrap();
    assert_eq!(edges.len(), 4);

    let report = evenness_from_db(&db, "road").await.unwrap();
    assert_eq!(report.edge_count, 2);
    let len = report.row(WeightBasis::Length).unwrap();
    assert_relative_eq!(len.evenness.unwrap(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(len.weighted_evenness.unwrap(), 2.0, epsilon = 1e-12);
}

#[tokio::test]
async fn missing_database_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_edges(&dir.path().join("main.db")).await.unwrap_err();
    assert!(matches!(err, MetricsError::MissingDatabase(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn evenness_stays_in_unit_interval(weights in proptest::collection::vec(0.001f64..1.0e6, 2..40)) {
        let wrapped: Vec<Option<f64>> = weights.iter().copied().map(Some).collect();
        let (evenness, weighted) = netdisrupt_metrics::evenness_of(&wrapped);
        let e = evenness.unwrap();
        prop_assert!(e >= -1e-12 && e <= 1.0 + 1e-12, "evenness {} out of range", e);
        let total: f64 = weights.iter().sum();
        prop_assert!((weighted.unwrap() - e * total).abs() <= 1e-6 * total.max(1.0));
    }

    #[test]
    fn uniform_vectors_score_one(w in 0.01f64..1.0e4, s in 2usize..60) {
        let weights = vec![Some(w); s];
        let (evenness, _) = netdisrupt_metrics::evenness_of(&weights);
        prop_assert!((evenness.unwrap() - 1.0).abs() < 1e-9);
    }
}
