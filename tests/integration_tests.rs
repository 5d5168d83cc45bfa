//! Integration tests for the complete disruption chain
//!
//! These tests verify end-to-end functionality across crates:
//! - Replication → Injection → Engine run → Results.csv
//! - Injection → Evenness of a disrupted database
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::{Path, PathBuf};

use netdisrupt_metrics::evenness_from_db;
use netdisrupt_scenario::{
    disrupt_network, make_disruption_scenarios, read_importance_csv, DisruptionType,
    EdgeCostStore, InjectOptions, ScenarioDocument, ScenarioLayout, DEFAULT_SCHEMA_NAMESPACE,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::tempdir;

// ============================================================================
// Fixtures
// ============================================================================

const SCENARIO_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Scenario xmlns="Schema_v7.0.0">
  <Scenario_Name>rs7</Scenario_Name>
  <Scenario_Description>capacity baseline</Scenario_Description>
</Scenario>
"#;

const IMPORTANCE_CSV: &str = "\
edge_id,sum_BC,volume,mode
1,0.40,120.0,road
2,0.90,15.0,road
3,0.10,300.0,road
4,0.65,60.0,road
";

/// A finished baseline run: metadata, a database with both tables, stale outputs.
async fn baseline(parent: &Path) -> PathBuf {
    let base = parent.join("rs7");
    fs::create_dir_all(base.join("logs")).unwrap();
    fs::create_dir_all(base.join("Reports")).unwrap();
    fs::create_dir_all(base.join("Maps")).unwrap();
    fs::write(base.join("scenario.xml"), SCENARIO_XML).unwrap();
    fs::write(base.join("Reports/summary.html"), "<html/>").unwrap();

    let options = SqliteConnectOptions::new()
        .filename(base.join("main.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    for ddl in [
        "CREATE TABLE networkx_edge_costs (edge_id INTEGER, phase_of_matter_id TEXT, route_cost REAL)",
        "CREATE TABLE edges (edge_id INTEGER PRIMARY KEY, mode TEXT, mode_oid INTEGER, \
         capac_minus_volume_zero_floor REAL, volume REAL, length REAL)",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    for id in 1..=4_i64 {
        sqlx::query("INSERT INTO networkx_edge_costs VALUES (?, 'solid', 2.0)")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO edges (edge_id, mode, mode_oid, capac_minus_volume_zero_floor, volume, length) \
             VALUES (?, 'road', ?, 10.0, ?, 1.0)",
        )
        .bind(id)
        .bind(100 + id)
        .bind(id as f64)
        .execute(&pool)
        .await
        .unwrap();
    }
    pool.close().await;
    base
}

// ============================================================================
// Replication → Injection
// ============================================================================

#[tokio::test]
async fn test_prepare_and_disrupt_by_betweenness() {
    let dir = tempdir().unwrap();
    let base = baseline(dir.path()).await;
    let kind = DisruptionType::BetweennessCentrality;

    let summary = make_disruption_scenarios(kind, 3, &base).unwrap();
    assert_eq!(summary.scenarios.len(), 3);
    assert!(!summary.scenarios[0].join("Reports").exists());

    let records = read_importance_csv(IMPORTANCE_CSV.as_bytes()).unwrap();
    let steps = disrupt_network(kind, 3, &base, &records, &InjectOptions::default())
        .await
        .unwrap();
    assert_eq!(steps[0].disabled_edges, vec![2]);
    assert_eq!(steps[1].disabled_edges, vec![2, 4]);
    assert_eq!(steps[2].disabled_edges, vec![2, 4, 1]);

    let layout = ScenarioLayout::new(&base, kind);
    for step in 1..=3_u32 {
        let store = EdgeCostStore::open(&layout.database_path(step)).await.unwrap();
        let disabled = &steps[step as usize - 1].disabled_edges;
        for id in 1..=4_i64 {
            let expected = if disabled.contains(&id) { 99_999.0 } else { 2.0 };
            assert_eq!(store.route_cost(id).await.unwrap(), Some(expected), "step {step} edge {id}");
        }
        store.close().await;

        let doc = ScenarioDocument::load(&layout.metadata_path(step), DEFAULT_SCHEMA_NAMESPACE).unwrap();
        assert_eq!(doc.scenario_name().unwrap(), format!("disrupt{step:02}"));
    }
}

#[tokio::test]
async fn test_disruption_leaves_edge_table_and_evenness_alone() {
    let dir = tempdir().unwrap();
    let base = baseline(dir.path()).await;
    let kind = DisruptionType::Volume;

    make_disruption_scenarios(kind, 1, &base).unwrap();
    let records = read_importance_csv(IMPORTANCE_CSV.as_bytes()).unwrap();
    disrupt_network(kind, 1, &base, &records, &InjectOptions::default())
        .await
        .unwrap();

    let layout = ScenarioLayout::new(&base, kind);
    let before = evenness_from_db(&base.join("main.db"), "road").await.unwrap();
    let after = evenness_from_db(&layout.database_path(1), "road").await.unwrap();
    assert_eq!(before.edge_count, 4);
    assert_eq!(before.rows, after.rows);
}

// ============================================================================
// Full chain with a scripted engine
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_full_chain_writes_results() {
    use netdisrupt_pipeline::{run_disruption_steps, PipelineConfig, ResultsTable};

    const ENGINE: &str = r#"
dir=$(dirname "$1")
if [ "$2" = "o2" ]; then
  {
    echo "INFO     number of optimal edges: 4"
    echo "RESULT   Total Unmet Demand Penalty:   1,000"
    echo "RESULT   Optimal Objective Value:   25,000"
  } > "$dir/logs/o2_log_2030_01_01_00-00-00.log"
fi
"#;

    let dir = tempdir().unwrap();
    let base = baseline(dir.path()).await;
    let kind = DisruptionType::Volume;
    let engine = dir.path().join("engine.sh");
    fs::write(&engine, ENGINE).unwrap();

    make_disruption_scenarios(kind, 2, &base).unwrap();
    let records = read_importance_csv(IMPORTANCE_CSV.as_bytes()).unwrap();
    disrupt_network(kind, 2, &base, &records, &InjectOptions::default())
        .await
        .unwrap();

    let config = PipelineConfig::new(Path::new("sh"), &engine).unwrap();
    let table = run_disruption_steps(kind, 2, &base, &config).await.unwrap();

    let layout = ScenarioLayout::new(&base, kind);
    assert_eq!(table.path, layout.results_path());
    let steps: Vec<&str> = table.rows.iter().map(|r| r.disrupt_step.as_str()).collect();
    assert_eq!(steps, vec!["01", "02"]);
    assert!(table.rows.iter().all(|r| r.total_cost.as_deref() == Some("25,000")));

    let csv = fs::read_to_string(layout.results_path()).unwrap();
    assert!(csv.starts_with("disrupt_step,unmet_cost,nedge,total_cost\n"));
    assert_eq!(ResultsTable::read_csv(&layout.results_path()).unwrap().rows, table.rows);
}
