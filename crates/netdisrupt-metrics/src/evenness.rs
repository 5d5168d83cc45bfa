//! Shannon evenness of edge-weight distributions.
//!
//! For a weight vector `w` over `S` edges:
//!
//! ```text
//! p_i      = w_i / Σ w
//! H'       = -Σ p_i ln p_i          (terms with p_i ≤ 0 or non-finite count as 0)
//! H_max    = ln S
//! evenness = H' / H_max             ∈ [0, 1] for positive weights
//! weighted = evenness · Σ w
//! ```
//!
//! `S < 2` makes `H_max` zero or undefined; both values are reported as `None`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::MetricsError;

/// Mode used when the caller does not pick one.
pub const DEFAULT_MODE: &str = "road";

/// One row of the FTOT-style `edges` table; only the columns the metrics need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EdgeRecord {
    pub mode: Option<String>,
    pub mode_oid: Option<i64>,
    pub capac_minus_volume_zero_floor: Option<f64>,
    pub volume: Option<f64>,
    pub length: Option<f64>,
}

/// The three weighting bases, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightBasis {
    AvailableCapacity,
    Volume,
    Length,
}

impl WeightBasis {
    pub const ALL: [WeightBasis; 3] = [Self::AvailableCapacity, Self::Volume, Self::Length];

    pub fn label(self) -> &'static str {
        match self {
            Self::AvailableCapacity => "Evenness_AvailCapac",
            Self::Volume => "Evenness_Vol",
            Self::Length => "Evenness_Len",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::AvailableCapacity => "capac_minus_volume_zero_floor",
            Self::Volume => "volume",
            Self::Length => "length",
        }
    }

    fn weight(self, edge: &EdgeRecord) -> Option<f64> {
        match self {
            Self::AvailableCapacity => edge.capac_minus_volume_zero_floor,
            Self::Volume => edge.volume,
            Self::Length => edge.length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvennessRow {
    pub metric: String,
    #[serde(rename = "Evenness")]
    pub evenness: Option<f64>,
    #[serde(rename = "Weighted_Evenness")]
    pub weighted_evenness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvennessReport {
    pub mode: String,
    /// Edge count after mode filtering and de-duplication (`S`).
    pub edge_count: usize,
    pub rows: Vec<EvennessRow>,
}

impl EvennessReport {
    pub fn row(&self, basis: WeightBasis) -> Option<&EvennessRow> {
        self.rows.iter().find(|r| r.metric == basis.label())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), MetricsError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

impl fmt::Display for EvennessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn cell(v: Option<f64>) -> String {
            v.map(|x| format!("{x:.6}")).unwrap_or_else(|| "NaN".to_string())
        }
        writeln!(f, "{:<22}{:>16}{:>20}", "", "Evenness", "Weighted_Evenness")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<22}{:>16}{:>20}",
                row.metric,
                cell(row.evenness),
                cell(row.weighted_evenness)
            )?;
        }
        Ok(())
    }
}

/// Keep edges of `mode`, first occurrence per `mode_oid`.
pub fn filter_edges<'a>(edges: &'a [EdgeRecord], mode: &str) -> Vec<&'a EdgeRecord> {
    let mut seen = HashSet::new();
    edges
        .iter()
        .filter(|e| e.mode.as_deref() == Some(mode))
        .filter(|e| seen.insert(e.mode_oid))
        .collect()
}

/// Evenness and weighted evenness of one weight vector.
///
/// `None` weights are left out of the total and contribute nothing to `H'`,
/// but still count towards `S`.
pub fn evenness_of(weights: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let species = weights.len();
    if species < 2 {
        return (None, None);
    }
    let h_max = (species as f64).ln();

    let total: f64 = weights.iter().flatten().filter(|w| !w.is_nan()).sum();
    if !(total.is_finite() && total > 0.0) {
        return (Some(0.0), Some(0.0));
    }

    let h_prime: f64 = -weights
        .iter()
        .flatten()
        .map(|w| w / total)
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>();

    let evenness = h_prime / h_max;
    (Some(evenness), Some(evenness * total))
}

/// Evenness report for the edges of `mode`.
pub fn evenness_metrics(edges: &[EdgeRecord], mode: &str) -> EvennessReport {
    let filtered = filter_edges(edges, mode);
    if filtered.len() < 2 {
        tracing::warn!(
            "only {} unique `{}` edge(s); evenness is undefined",
            filtered.len(),
            mode
        );
    }

    let rows = WeightBasis::ALL
        .iter()
        .map(|&basis| {
            let weights: Vec<Option<f64>> = filtered.iter().map(|e| basis.weight(e)).collect();
            let (evenness, weighted_evenness) = evenness_of(&weights);
            tracing::debug!(
                "{} over {}: evenness={:?}",
                basis.label(),
                basis.column(),
                evenness
            );
            EvennessRow {
                metric: basis.label().to_string(),
                evenness,
                weighted_evenness,
            }
        })
        .collect();

    EvennessReport {
        mode: mode.to_string(),
        edge_count: filtered.len(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn edge(mode: &str, oid: i64, capac: f64, vol: f64, len: f64) -> EdgeRecord {
        EdgeRecord {
            mode: Some(mode.to_string()),
            mode_oid: Some(oid),
            capac_minus_volume_zero_floor: Some(capac),
            volume: Some(vol),
            length: Some(len),
        }
    }

    #[test]
    fn uniform_weights_are_perfectly_even() {
        let edges: Vec<_> = (0..7).map(|i| edge("road", i, 3.0, 10.0, 2.5)).collect();
        let report = evenness_metrics(&edges, "road");
        assert_eq!(report.edge_count, 7);
        for row in &report.rows {
            assert_relative_eq!(row.evenness.unwrap(), 1.0, epsilon = 1e-12);
        }
        let vol = report.row(WeightBasis::Volume).unwrap();
        assert_relative_eq!(vol.weighted_evenness.unwrap(), 70.0, epsilon = 1e-9);
    }

    #[test]
    fn rows_are_in_fixed_order() {
        let edges = vec![edge("road", 1, 1.0, 1.0, 1.0), edge("road", 2, 2.0, 2.0, 2.0)];
        let labels: Vec<_> = evenness_metrics(&edges, "road")
            .rows
            .into_iter()
            .map(|r| r.metric)
            .collect();
        assert_eq!(
            labels,
            vec!["Evenness_AvailCapac", "Evenness_Vol", "Evenness_Len"]
        );
    }

    #[test]
    fn concentrated_weights_score_low() {
        let edges = vec![
            edge("road", 1, 1000.0, 1.0, 1.0),
            edge("road", 2, 0.001, 1.0, 1.0),
            edge("road", 3, 0.001, 1.0, 1.0),
        ];
        let report = evenness_metrics(&edges, "road");
        let capac = report.row(WeightBasis::AvailableCapacity).unwrap();
        assert!(capac.evenness.unwrap() < 0.01);
    }

    #[test]
    fn zero_weight_edges_contribute_nothing() {
        // p = 0 must not poison the sum with NaN.
        let edges = vec![
            edge("road", 1, 0.0, 5.0, 1.0),
            edge("road", 2, 4.0, 5.0, 1.0),
            edge("road", 3, 4.0, 5.0, 1.0),
        ];
        let capac = evenness_metrics(&edges, "road").rows[0].clone();
        let expected = 2.0f64.ln() / 3.0f64.ln();
        assert_relative_eq!(capac.evenness.unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(capac.weighted_evenness.unwrap(), expected * 8.0, epsilon = 1e-9);
    }

    #[test]
    fn filters_mode_and_duplicate_oids() {
        let edges = vec![
            edge("road", 1, 1.0, 1.0, 1.0),
            edge("road", 1, 99.0, 99.0, 99.0),
            edge("rail", 2, 50.0, 50.0, 50.0),
            edge("road", 3, 1.0, 1.0, 1.0),
        ];
        let report = evenness_metrics(&edges, "road");
        assert_eq!(report.edge_count, 2);
        // The duplicate (99.0) was dropped, so the two survivors are uniform.
        assert_relative_eq!(report.rows[1].evenness.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn single_edge_is_undefined_not_nan() {
        let report = evenness_metrics(&[edge("road", 1, 5.0, 5.0, 5.0)], "road");
        assert_eq!(report.edge_count, 1);
        for row in &report.rows {
            assert_eq!(row.evenness, None);
            assert_eq!(row.weighted_evenness, None);
        }
    }

    #[test]
    fn empty_selection_is_undefined() {
        let report = evenness_metrics(&[edge("rail", 1, 5.0, 5.0, 5.0)], "road");
        assert_eq!(report.edge_count, 0);
        assert!(report.rows.iter().all(|r| r.evenness.is_none()));
        assert!(report.to_string().contains("NaN"));
    }

    #[test]
    fn all_zero_weights_report_zero() {
        let edges = vec![edge("road", 1, 0.0, 0.0, 1.0), edge("road", 2, 0.0, 0.0, 1.0)];
        let report = evenness_metrics(&edges, "road");
        assert_eq!(report.rows[0].evenness, Some(0.0));
        assert_eq!(report.rows[0].weighted_evenness, Some(0.0));
    }

    #[test]
    fn null_weights_are_skipped() {
        let mut sparse = edge("road", 2, 1.0, 1.0, 1.0);
        sparse.volume = None;
        let edges = vec![edge("road", 1, 1.0, 1.0, 1.0), sparse];
        let vol = evenness_metrics(&edges, "road").rows[1].clone();
        // One edge holds the whole volume: H' = 0.
        assert_relative_eq!(vol.evenness.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn csv_output_has_header_and_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evenness.csv");
        let edges = vec![edge("road", 1, 1.0, 1.0, 1.0), edge("road", 2, 1.0, 3.0, 1.0)];
        evenness_metrics(&edges, "road").write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("metric,Evenness,Weighted_Evenness"));
        assert_eq!(lines.count(), 3);
    }
}
