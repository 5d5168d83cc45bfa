//! Edge importance table and the disruption order derived from it.

use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::ScenarioError;
use crate::layout::DisruptionType;

/// One edge of the baseline's optimal solution with its importance scores.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EdgeImportance {
    pub edge_id: i64,
    #[serde(rename = "sum_BC")]
    pub sum_bc: f64,
    pub volume: f64,
}

impl EdgeImportance {
    pub fn metric(&self, kind: DisruptionType) -> f64 {
        match kind {
            DisruptionType::BetweennessCentrality => self.sum_bc,
            DisruptionType::Volume => self.volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Highest-impact edges first.
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Read an importance table from CSV. Extra columns are ignored.
pub fn read_importance_csv<R: Read>(reader: R) -> Result<Vec<EdgeImportance>, ScenarioError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for row in rdr.deserialize::<EdgeImportance>() {
        let row = row?;
        if !seen.insert(row.edge_id) {
            return Err(ScenarioError::DuplicateEdge(row.edge_id));
        }
        records.push(row);
    }
    Ok(records)
}

pub fn load_importance(path: &Path) -> Result<Vec<EdgeImportance>, ScenarioError> {
    let file = std::fs::File::open(path).map_err(|e| ScenarioError::fs(path, e))?;
    let records = read_importance_csv(file)?;
    tracing::info!("loaded {} ranked edges from {}", records.len(), path.display());
    Ok(records)
}

/// Edge ids ranked by `kind`'s metric. Ties keep table order; NaN sorts last.
pub fn disruption_order(
    records: &[EdgeImportance],
    kind: DisruptionType,
    order: SortOrder,
) -> Vec<i64> {
    let mut ranked: Vec<&EdgeImportance> = records.iter().collect();
    ranked.sort_by(|a, b| {
        let (x, y) = (a.metric(kind), b.metric(kind));
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match order {
                SortOrder::Descending => y.total_cmp(&x),
                SortOrder::Ascending => x.total_cmp(&y),
            },
        }
    });
    ranked.into_iter().map(|r| r.edge_id).collect()
}

/// The cumulative set disabled at 1-based `step`.
pub fn edges_for_step(order: &[i64], step: u32) -> &[i64] {
    let n = (step as usize).min(order.len());
    &order[..n]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<EdgeImportance> {
        vec![
            EdgeImportance { edge_id: 1, sum_bc: 5.0, volume: 30.0 },
            EdgeImportance { edge_id: 2, sum_bc: 9.0, volume: 10.0 },
            EdgeImportance { edge_id: 3, sum_bc: 1.0, volume: 20.0 },
        ]
    }

    #[test]
    fn descending_bc_picks_the_most_central_edge_first() {
        let order = disruption_order(&table(), DisruptionType::BetweennessCentrality, SortOrder::Descending);
        assert_eq!(edges_for_step(&order, 1), &[2]);
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn ascending_bc_picks_the_least_central_edge_first() {
        let order = disruption_order(&table(), DisruptionType::BetweennessCentrality, SortOrder::Ascending);
        assert_eq!(edges_for_step(&order, 1), &[3]);
    }

    #[test]
    fn volume_ranking_uses_volume_column() {
        let order = disruption_order(&table(), DisruptionType::Volume, SortOrder::default());
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn step_beyond_table_takes_everything() {
        let order = vec![4, 5];
        assert_eq!(edges_for_step(&order, 9), &[4, 5]);
    }

    #[test]
    fn nan_metrics_sort_last_both_ways() {
        let mut t = table();
        t[0].sum_bc = f64::NAN;
        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let ranked = disruption_order(&t, DisruptionType::BetweennessCentrality, order);
            assert_eq!(ranked.last(), Some(&1));
        }
    }

    #[test]
    fn csv_ignores_extra_columns_and_rejects_duplicates() {
        let csv = "edge_id,from_node,sum_BC,volume\n7,a,1.5,2\n8,b,0.5,4\n";
        let rows = read_importance_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sum_bc, 1.5);

        let dup = "edge_id,sum_BC,volume\n7,1,1\n7,2,2\n";
        let err = read_importance_csv(dup.as_bytes()).unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateEdge(7)));
    }
}
