//! Sequential execution of every disruption step.
//!
//! ```text
//! for k in 1..=N:
//!     o1 -> o2 -> p -> d [-> m]     one child at a time, in disruptNN/
//!     logs/o2_* (latest)  -> StepResult
//! Results.csv <- rows in step order
//! ```

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use netdisrupt_scenario::{step_label, step_name, DisruptionType, ScenarioError, ScenarioLayout};

use crate::config::{PipelineConfig, Stage};
use crate::error::PipelineError;
use crate::harvest::{latest_log, LogHarvester, StepResult};
use crate::process::run_drained;

/// Harvested rows, plus where they were written.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    pub rows: Vec<StepResult>,
    pub path: PathBuf,
}

impl ResultsTable {
    pub fn write_csv(rows: &[StepResult], path: &Path) -> Result<(), PipelineError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }

    /// Read a previously written table back.
    pub fn read_csv(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader.deserialize().collect::<Result<Vec<StepResult>, _>>()?;
        Ok(Self {
            rows,
            path: path.to_path_buf(),
        })
    }
}

impl fmt::Display for ResultsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        writeln!(f, "{:<6} {:>18} {:>8} {:>18}", "step", "unmet_cost", "nedge", "total_cost")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<6} {:>18} {:>8} {:>18}",
                row.disrupt_step,
                cell(&row.unmet_cost),
                cell(&row.nedge),
                cell(&row.total_cost)
            )?;
        }
        Ok(())
    }
}

/// Run one stage of one step; any failure aborts the step.
async fn run_stage(
    config: &PipelineConfig,
    layout: &ScenarioLayout,
    step: u32,
    stage: Stage,
) -> Result<(), PipelineError> {
    let scenario_dir = layout.step_dir(step);
    let metadata = layout.metadata_path(step);
    let label = format!("{} {}", step_name(step), stage);
    tracing::info!("running {label}");

    let args = [
        config.entrypoint.as_os_str(),
        metadata.as_os_str(),
        OsStr::new(stage.code()),
    ];
    let output = run_drained(
        &config.interpreter,
        args,
        Some(&scenario_dir),
        config.stage_timeout,
        &label,
    )
    .await?;

    let Some(output) = output else {
        return Err(PipelineError::StageTimeout {
            step: step_name(step),
            stage: stage.code().to_string(),
            timeout: config.stage_timeout.unwrap_or_default(),
        });
    };
    if !output.status.success() {
        return Err(PipelineError::StageFailed {
            step: step_name(step),
            stage: stage.code().to_string(),
            status: output.status,
            stderr_tail: output.stderr.tail,
        });
    }
    tracing::debug!("{label}: {} stdout lines", output.stdout.lines);
    Ok(())
}

/// Run the engine over `disrupt01..=disruptNN` and collect the results.
///
/// Writes `Results.csv` to the disruption root and returns the same rows.
pub async fn run_disruption_steps(
    kind: DisruptionType,
    steps: u32,
    baseline: &Path,
    config: &PipelineConfig,
) -> Result<ResultsTable, PipelineError> {
    if steps == 0 {
        return Err(ScenarioError::InvalidSteps.into());
    }
    let layout = ScenarioLayout::new(baseline, kind);
    let harvester = LogHarvester::new(config.match_policy)?;
    let stages = config.stages();

    let mut rows = Vec::with_capacity(steps as usize);
    for step in 1..=steps {
        let scenario_dir = layout.step_dir(step);
        if !scenario_dir.is_dir() {
            return Err(ScenarioError::MissingScenario(scenario_dir).into());
        }

        for &stage in &stages {
            run_stage(config, &layout, step, stage).await?;
        }

        let log = latest_log(&layout.logs_dir(step), &config.log_prefix)?;
        tracing::debug!("harvesting {}", log.display());
        let row = harvester.harvest_file(&log, &step_label(step))?;
        tracing::info!(
            "{}: unmet_cost={:?} nedge={:?} total_cost={:?}",
            step_name(step),
            row.unmet_cost,
            row.nedge,
            row.total_cost
        );
        rows.push(row);
    }

    let path = layout.results_path();
    ResultsTable::write_csv(&rows, &path)?;
    tracing::info!("Wrote {} result rows to {}", rows.len(), path.display());
    Ok(ResultsTable { rows, path })
}
