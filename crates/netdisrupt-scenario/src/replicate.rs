//! Scenario replication: one fresh copy of the baseline per disruption step.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ScenarioError;
use crate::layout::{DisruptionType, ScenarioLayout};

/// Subdirectories regenerated by every pipeline run; never carried over.
pub const STRIPPED_DIRS: &[&str] = &["Reports", "Maps"];

#[derive(Debug, Clone)]
pub struct ReplicationSummary {
    pub root: PathBuf,
    pub scenarios: Vec<PathBuf>,
}

/// Create `disrupt01..disruptNN` under the disruption root of `baseline`.
///
/// Existing step directories are removed first. A failure part-way leaves
/// whatever was already written on disk.
pub fn make_disruption_scenarios(
    kind: DisruptionType,
    steps: u32,
    baseline: &Path,
) -> Result<ReplicationSummary, ScenarioError> {
    if steps == 0 {
        return Err(ScenarioError::InvalidSteps);
    }
    if !baseline.is_dir() {
        return Err(ScenarioError::fs(
            baseline,
            std::io::Error::new(std::io::ErrorKind::NotFound, "baseline scenario not found"),
        ));
    }

    let layout = ScenarioLayout::new(baseline, kind);
    let root = layout.root();
    if !root.exists() {
        fs::create_dir(root).map_err(|e| ScenarioError::fs(root, e))?;
    }

    let mut scenarios = Vec::with_capacity(steps as usize);
    for step in 1..=steps {
        let dest = layout.step_dir(step);
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| ScenarioError::fs(&dest, e))?;
        }
        copy_tree(baseline, &dest)?;

        for name in STRIPPED_DIRS {
            let stale = dest.join(name);
            if stale.exists() {
                fs::remove_dir_all(&stale).map_err(|e| ScenarioError::fs(&stale, e))?;
            }
        }
        tracing::debug!("created {}", dest.display());
        scenarios.push(dest);
    }

    tracing::info!(
        "Prepared {} scenarios based on {}",
        steps,
        layout.baseline_name()
    );
    Ok(ReplicationSummary {
        root: root.to_path_buf(),
        scenarios,
    })
}

/// Recursive copy; symlinks are followed and materialized as regular files/dirs.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64, ScenarioError> {
    let mut files = 0u64;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            ScenarioError::fs(path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| ScenarioError::fs(entry.path(), std::io::Error::other(e)))?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ScenarioError::fs(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| ScenarioError::fs(entry.path(), e))?;
            files += 1;
        }
    }
    Ok(files)
}
