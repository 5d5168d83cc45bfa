//! Metric extraction from solve-stage logs.
//!
//! The engine prints its results as free text; three result lines matter:
//!
//! ```text
//! RESULT   Total Unmet Demand Penalty:   1,234
//! INFO     number of optimal edges:      87
//! RESULT   Optimal Objective Value:      12,345
//! ```
//!
//! Values are kept verbatim, thousands separators included.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

const NUMBER: &str = r"\d+(?:,\d+)*(?:\.\d+)?";

/// Which value wins when a field matches more than once in one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    FirstMatch,
    /// Later runs of the solver append to the same log; keep the newest value.
    #[default]
    LastMatch,
}

/// Results of one disruption step; `None` where the log had no match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub disrupt_step: String,
    pub unmet_cost: Option<String>,
    pub nedge: Option<String>,
    pub total_cost: Option<String>,
}

impl StepResult {
    pub fn unmet_cost_value(&self) -> Option<f64> {
        self.unmet_cost.as_deref().and_then(parse_number)
    }

    pub fn nedge_value(&self) -> Option<u64> {
        self.nedge.as_deref().and_then(|s| s.replace(',', "").parse().ok())
    }

    pub fn total_cost_value(&self) -> Option<f64> {
        self.total_cost.as_deref().and_then(parse_number)
    }
}

/// Parse a harvested number, dropping thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', "").parse().ok()
}

#[derive(Debug, Clone)]
pub struct LogHarvester {
    unmet_cost: Regex,
    nedge: Regex,
    total_cost: Regex,
    policy: MatchPolicy,
}

impl LogHarvester {
    pub fn new(policy: MatchPolicy) -> Result<Self, PipelineError> {
        Ok(Self {
            unmet_cost: Regex::new(&format!(
                r"RESULT\s+Total Unmet Demand Penalty:\s+({NUMBER})"
            ))?,
            nedge: Regex::new(r"INFO\s+number of optimal edges:\s+(\d+)")?,
            total_cost: Regex::new(&format!(r"RESULT\s+Optimal Objective Value:\s+({NUMBER})"))?,
            policy,
        })
    }

    fn keep(&self, slot: &mut Option<String>, re: &Regex, line: &str) {
        for caps in re.captures_iter(line) {
            let value = caps[1].to_string();
            match self.policy {
                MatchPolicy::FirstMatch if slot.is_some() => return,
                _ => *slot = Some(value),
            }
        }
    }

    /// Scan `reader` line by line; fields without a match stay `None`.
    ///
    /// Lines are decoded lossily, so stray non-UTF-8 bytes never hide a result line.
    pub fn harvest<R: BufRead>(&self, mut reader: R, step: &str) -> std::io::Result<StepResult> {
        let mut result = StepResult {
            disrupt_step: step.to_string(),
            ..StepResult::default()
        };
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.keep(&mut result.unmet_cost, &self.unmet_cost, &line);
            self.keep(&mut result.nedge, &self.nedge, &line);
            self.keep(&mut result.total_cost, &self.total_cost, &line);
        }

        for (field, value) in [
            ("unmet_cost", &result.unmet_cost),
            ("nedge", &result.nedge),
            ("total_cost", &result.total_cost),
        ] {
            if value.is_none() {
                tracing::debug!("step {step}: no `{field}` line in log");
            }
        }
        Ok(result)
    }

    pub fn harvest_file(&self, path: &Path, step: &str) -> Result<StepResult, PipelineError> {
        let file = fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
        self.harvest(BufReader::new(file), step)
            .map_err(|e| PipelineError::io(path, e))
    }
}

pub fn harvest_log(path: &Path, step: &str, policy: MatchPolicy) -> Result<StepResult, PipelineError> {
    LogHarvester::new(policy)?.harvest_file(path, step)
}

/// Lexicographically greatest file in `dir` whose name starts with `prefix`.
///
/// Engine logs carry a `YYYY_MM_DD_HH-MM-SS` suffix, so name order is time order.
pub fn latest_log(dir: &Path, prefix: &str) -> Result<PathBuf, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::LogDiscovery {
        dir: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !entry.path().is_file() {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }

    latest.map(|(_, path)| path).ok_or_else(|| PipelineError::LogDiscovery {
        dir: dir.to_path_buf(),
        reason: format!("no file starting with `{prefix}`"),
    })
}
