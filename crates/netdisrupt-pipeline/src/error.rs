use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use netdisrupt_scenario::ScenarioError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start `{}`: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} stage {stage} exited with {status}{}", stderr_suffix(.stderr_tail))]
    StageFailed {
        step: String,
        stage: String,
        status: ExitStatus,
        stderr_tail: Vec<String>,
    },

    #[error("{step} stage {stage} timed out after {}s", .timeout.as_secs())]
    StageTimeout {
        step: String,
        stage: String,
        timeout: Duration,
    },

    #[error("no log found in {}: {reason}", dir.display())]
    LogDiscovery { dir: PathBuf, reason: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("results table: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

fn stderr_suffix(tail: &[String]) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n{}", tail.join("\n"))
    }
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
