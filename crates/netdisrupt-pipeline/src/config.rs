//! Validated settings for driving the external engine.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;
use crate::harvest::MatchPolicy;

/// Sub-stages of the engine, in the order they always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    OptimizationSetup,
    OptimizationSolve,
    PostProcessing,
    Reporting,
    Mapping,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Self::OptimizationSetup,
        Self::OptimizationSolve,
        Self::PostProcessing,
        Self::Reporting,
        Self::Mapping,
    ];

    /// Command-line code understood by the engine.
    pub fn code(self) -> &'static str {
        match self {
            Self::OptimizationSetup => "o1",
            Self::OptimizationSolve => "o2",
            Self::PostProcessing => "p",
            Self::Reporting => "d",
            Self::Mapping => "m",
        }
    }

    /// Stages to run for one scenario; mapping is optional.
    pub fn sequence(make_maps: bool) -> Vec<Stage> {
        Self::ORDER
            .into_iter()
            .filter(|s| make_maps || *s != Self::Mapping)
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interpreter that runs the engine entry point (e.g. a Python executable).
    pub interpreter: PathBuf,
    pub entrypoint: PathBuf,
    pub make_maps: bool,
    /// Per-stage wall-clock limit; `None` waits indefinitely.
    pub stage_timeout: Option<Duration>,
    /// File-name prefix of the solve-stage log.
    pub log_prefix: String,
    pub match_policy: MatchPolicy,
}

impl PipelineConfig {
    /// Resolve and check paths; the returned config is ready to use.
    pub fn new(interpreter: &Path, entrypoint: &Path) -> Result<Self, PipelineError> {
        let interpreter = resolve_program(interpreter).ok_or_else(|| {
            PipelineError::Config(format!("interpreter not found: {}", interpreter.display()))
        })?;
        if !entrypoint.is_file() {
            return Err(PipelineError::Config(format!(
                "pipeline entry point not found: {}",
                entrypoint.display()
            )));
        }
        Ok(Self {
            interpreter,
            entrypoint: entrypoint.to_path_buf(),
            make_maps: false,
            stage_timeout: None,
            log_prefix: format!("{}_", Stage::OptimizationSolve.code()),
            match_policy: MatchPolicy::default(),
        })
    }

    pub fn with_maps(mut self, make_maps: bool) -> Self {
        self.make_maps = make_maps;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        Stage::sequence(self.make_maps)
    }
}

/// An existing file path, or a bare program name found on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    if program.is_file() {
        return Some(program.to_path_buf());
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .flat_map(|dir| {
            let plain = dir.join(program);
            let exe = dir.join(program).with_extension(env::consts::EXE_EXTENSION);
            [plain, exe]
        })
        .find(|candidate| candidate.is_file())
}
