//! Rendering the HTML summary of a disruption run.
//!
//! The renderer is an external script; this module only runs it, watches its
//! stderr, and says where the page should be.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use crate::error::PipelineError;
use crate::process::run_drained;

pub const DEFAULT_RENDERER: &str = "Rscript";
pub const DEFAULT_REPORT_SCRIPT: &str = "compile_report.R";
pub const REPORT_HTML: &str = "Disruption_Results.html";

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub renderer: PathBuf,
    pub script: PathBuf,
    /// Directory the renderer runs in; the HTML lands here.
    pub workdir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            renderer: PathBuf::from(DEFAULT_RENDERER),
            script: PathBuf::from(DEFAULT_REPORT_SCRIPT),
            workdir: PathBuf::from("."),
            timeout: None,
        }
    }
}

impl ReportConfig {
    pub fn html_path(&self) -> PathBuf {
        self.workdir.join(REPORT_HTML)
    }
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Renderer wrote something to stderr.
    pub had_errors: bool,
    pub status: ExitStatus,
    pub html_path: PathBuf,
}

impl ReportOutcome {
    pub fn succeeded(&self) -> bool {
        !self.had_errors && self.status.success()
    }

    /// Whether the page is worth opening; a failed render may leave a stale page behind.
    pub fn viewable(&self) -> bool {
        self.succeeded() && self.html_path.is_file()
    }
}

/// Run `<renderer> <script> <baseline_id>` in the configured directory and wait for it.
pub async fn compile_report(config: &ReportConfig, baseline_id: &str) -> Result<ReportOutcome, PipelineError> {
    if !config.workdir.is_dir() {
        return Err(PipelineError::Config(format!(
            "report directory not found: {}",
            config.workdir.display()
        )));
    }
    tracing::info!("compiling report for {baseline_id}");

    let args = [config.script.as_os_str(), OsStr::new(baseline_id)];
    let output = run_drained(
        &config.renderer,
        args,
        Some(config.workdir.as_path()),
        config.timeout,
        "report",
    )
    .await?;

    let Some(output) = output else {
        return Err(PipelineError::StageTimeout {
            step: baseline_id.to_string(),
            stage: "report".to_string(),
            timeout: config.timeout.unwrap_or_default(),
        });
    };

    let outcome = ReportOutcome {
        had_errors: output.saw_stderr(),
        status: output.status,
        html_path: config.html_path(),
    };
    if outcome.had_errors {
        tracing::warn!("report renderer reported errors");
    } else if !outcome.status.success() {
        tracing::warn!("report renderer exited with {}", outcome.status);
    }
    Ok(outcome)
}
