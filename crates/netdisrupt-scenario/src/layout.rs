//! Naming and on-disk layout of disruption scenarios.
//!
//! ```text
//! <parent>/
//! ├── <base>/                      completed baseline run
//! └── <base>_<TYPE>_disrupt/       disruption root
//!     ├── disrupt01/               full copy of <base>, minus Reports/ and Maps/
//!     ├── disrupt02/
//!     └── Results.csv
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ScenarioError;

pub const METADATA_FILE: &str = "scenario.xml";
pub const DATABASE_FILE: &str = "main.db";
pub const LOGS_DIR: &str = "logs";
pub const RESULTS_FILE: &str = "Results.csv";

/// Which importance metric orders the edges to disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisruptionType {
    /// Sum of betweenness centrality (`sum_BC`).
    BetweennessCentrality,
    /// Flow volume (`volume`).
    Volume,
}

impl DisruptionType {
    pub fn tag(self) -> &'static str {
        match self {
            Self::BetweennessCentrality => "BC",
            Self::Volume => "V",
        }
    }

    /// Column of the importance table this type ranks by.
    pub fn metric_column(self) -> &'static str {
        match self {
            Self::BetweennessCentrality => "sum_BC",
            Self::Volume => "volume",
        }
    }
}

impl FromStr for DisruptionType {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "BC" => Ok(Self::BetweennessCentrality),
            "V" => Ok(Self::Volume),
            other => Err(ScenarioError::UnsupportedDisruptionType(other.to_string())),
        }
    }
}

impl fmt::Display for DisruptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// `disruptNN` for 1-based `step`.
pub fn step_name(step: u32) -> String {
    format!("disrupt{step:02}")
}

/// Two-digit step label as it appears in results.
pub fn step_label(step: u32) -> String {
    format!("{step:02}")
}

/// Paths derived from one baseline scenario and disruption type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioLayout {
    baseline: PathBuf,
    kind: DisruptionType,
    root: PathBuf,
}

impl ScenarioLayout {
    pub fn new(baseline: &Path, kind: DisruptionType) -> Self {
        let base_name = baseline
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = baseline.parent().unwrap_or_else(|| Path::new(""));
        let root = parent.join(format!("{base_name}_{}_disrupt", kind.tag()));
        Self {
            baseline: baseline.to_path_buf(),
            kind,
            root,
        }
    }

    pub fn baseline(&self) -> &Path {
        &self.baseline
    }

    pub fn baseline_name(&self) -> String {
        self.baseline
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> DisruptionType {
        self.kind
    }

    /// The disruption root, sibling of the baseline.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn step_dir(&self, step: u32) -> PathBuf {
        self.root.join(step_name(step))
    }

    pub fn metadata_path(&self, step: u32) -> PathBuf {
        self.step_dir(step).join(METADATA_FILE)
    }

    pub fn database_path(&self, step: u32) -> PathBuf {
        self.step_dir(step).join(DATABASE_FILE)
    }

    pub fn logs_dir(&self, step: u32) -> PathBuf {
        self.step_dir(step).join(LOGS_DIR)
    }

    pub fn results_path(&self) -> PathBuf {
        self.root.join(RESULTS_FILE)
    }
}
