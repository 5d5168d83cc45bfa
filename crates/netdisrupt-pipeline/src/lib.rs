//! Engine driver
//!
//! Runs the external optimization engine over each prepared disruption step
//! and turns its logs into a results table:
//!
//! ```text
//! disruptNN/scenario.xml ──► interpreter entrypoint scenario.xml {o1,o2,p,d,m}
//!                                 │ stdout → info!, stderr → warn!
//!                                 ▼
//! disruptNN/logs/o2_*.log ──► LogHarvester ──► StepResult ──► Results.csv
//! ```
//!
//! A stage that exits non-zero or overruns its timeout stops the run.
//! [`compile_report`] renders the final HTML summary the same way.

pub mod config;
pub mod error;
pub mod harvest;
pub mod orchestrate;
pub mod process;
pub mod report;

pub use config::{resolve_program, PipelineConfig, Stage};
pub use error::PipelineError;
pub use harvest::{harvest_log, latest_log, parse_number, LogHarvester, MatchPolicy, StepResult};
pub use orchestrate::{run_disruption_steps, ResultsTable};
pub use process::{run_drained, DrainStats, DrainedOutput};
pub use report::{
    compile_report, ReportConfig, ReportOutcome, DEFAULT_RENDERER, DEFAULT_REPORT_SCRIPT,
    REPORT_HTML,
};
