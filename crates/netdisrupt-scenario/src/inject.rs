//! Cumulative edge disruption of replicated scenarios.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::ScenarioError;
use crate::importance::{disruption_order, edges_for_step, EdgeImportance, SortOrder};
use crate::layout::{step_name, DisruptionType, ScenarioLayout};
use crate::metadata::{rename_scenario, DEFAULT_SCHEMA_NAMESPACE};
use crate::store::{EdgeCostStore, DEFAULT_SENTINEL_COST};

/// Backoff for transient storage errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The delay doubles after every transient failure.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ScenarioError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScenarioError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "{what}: attempt {attempt}/{} failed ({e}); retrying in {:?}",
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub order: SortOrder,
    pub sentinel_cost: f64,
    pub namespace: String,
    pub retry: RetryPolicy,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            order: SortOrder::Descending,
            sentinel_cost: DEFAULT_SENTINEL_COST,
            namespace: DEFAULT_SCHEMA_NAMESPACE.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl InjectOptions {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.sentinel_cost.is_finite() && self.sentinel_cost > 0.0) {
            return Err(ScenarioError::InvalidSentinel(self.sentinel_cost));
        }
        Ok(())
    }
}

/// What one step disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDisruption {
    pub step: u32,
    pub name: String,
    pub disabled_edges: Vec<i64>,
    pub rows_updated: u64,
}

async fn disable_once(db: &Path, edges: &[i64], sentinel: f64) -> Result<u64, ScenarioError> {
    let store = EdgeCostStore::open(db).await?;
    let result = store.disable_edges(edges, sentinel).await;
    store.close().await;
    result
}

/// Disable the first `k` ranked edges in `disruptNN` for every step `k` in `1..=steps`.
pub async fn disrupt_network(
    kind: DisruptionType,
    steps: u32,
    baseline: &Path,
    records: &[EdgeImportance],
    options: &InjectOptions,
) -> Result<Vec<StepDisruption>, ScenarioError> {
    if steps == 0 {
        return Err(ScenarioError::InvalidSteps);
    }
    options.validate()?;

    let layout = ScenarioLayout::new(baseline, kind);
    let order = disruption_order(records, kind, options.order);
    tracing::debug!(
        "ranked {} edges by {} ({:?})",
        order.len(),
        kind.metric_column(),
        options.order
    );

    let mut applied = Vec::with_capacity(steps as usize);
    for step in 1..=steps {
        let name = step_name(step);
        let dir = layout.step_dir(step);
        if !dir.is_dir() {
            return Err(ScenarioError::MissingScenario(dir));
        }

        let edges = edges_for_step(&order, step);
        let db = layout.database_path(step);
        let rows_updated = options
            .retry
            .run(&name, || disable_once(&db, edges, options.sentinel_cost))
            .await?;
        if rows_updated < edges.len() as u64 {
            tracing::warn!(
                "{name}: {} of {} edges matched in the edge-cost table",
                rows_updated,
                edges.len()
            );
        }

        rename_scenario(&layout.metadata_path(step), &options.namespace, &name)?;
        tracing::debug!("{name}: disabled {:?}", edges);

        applied.push(StepDisruption {
            step,
            name,
            disabled_edges: edges.to_vec(),
            rows_updated,
        });
    }

    tracing::info!("Disrupted {} scenarios", steps);
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_non_positive_sentinel() {
        let opts = InjectOptions {
            sentinel_cost: 0.0,
            ..InjectOptions::default()
        };
        assert!(matches!(opts.validate(), Err(ScenarioError::InvalidSentinel(_))));
        let opts = InjectOptions {
            sentinel_cost: f64::INFINITY,
            ..InjectOptions::default()
        };
        assert!(opts.validate().is_err());
    }

    #[tokio::test]
    async fn retry_gives_up_on_permanent_errors() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
        };
        let mut calls = 0;
        let result: Result<(), _> = policy
            .run("test", || {
                calls += 1;
                async { Err(ScenarioError::InvalidSteps) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_repeats_transient_errors_then_succeeds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
        };
        let mut calls = 0;
        let result = policy
            .run("test", || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(ScenarioError::TransientStorage {
                            path: "main.db".into(),
                            source: sqlx::Error::PoolTimedOut,
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
    }

    proptest! {
        #[test]
        fn disruption_is_cumulative(
            metrics in proptest::collection::vec(0.0f64..1000.0, 1..30),
            ascending in any::<bool>(),
        ) {
            let records: Vec<EdgeImportance> = metrics
                .iter()
                .enumerate()
                .map(|(i, &m)| EdgeImportance { edge_id: i as i64, sum_bc: m, volume: m })
                .collect();
            let order = disruption_order(
                &records,
                DisruptionType::BetweennessCentrality,
                SortOrder::from_ascending(ascending),
            );
            for k in 1..=records.len() as u32 {
                let prev = edges_for_step(&order, k - 1);
                let cur = edges_for_step(&order, k);
                prop_assert_eq!(cur.len(), k as usize);
                prop_assert!(prev.iter().all(|e| cur.contains(e)));
            }
        }
    }
}
