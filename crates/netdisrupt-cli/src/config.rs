//! Settings merged from a JSON file, command-line flags and the environment.
//!
//! Precedence, highest first: flag, `--config` file, environment variable,
//! built-in default. Everything is validated before any work starts.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use netdisrupt_pipeline::{MatchPolicy, PipelineConfig, ReportConfig};
use netdisrupt_scenario::{InjectOptions, SortOrder};

pub const ENV_INTERPRETER: &str = "NETDISRUPT_PYTHON";
pub const ENV_ENTRYPOINT: &str = "NETDISRUPT_ENTRYPOINT";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub interpreter: Option<PathBuf>,
    pub entrypoint: Option<PathBuf>,
    pub make_maps: Option<bool>,
    pub stage_timeout_secs: Option<u64>,
    /// `"first"` or `"last"`.
    pub match_policy: Option<String>,
    pub sentinel_cost: Option<f64>,
    pub ascending: Option<bool>,
    pub renderer: Option<PathBuf>,
    pub report_script: Option<PathBuf>,
    pub report_timeout_secs: Option<u64>,
    pub namespace: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map(Self::load).transpose().map(Option::unwrap_or_default)
    }
}

/// Flags shared by every command that drives the engine.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Interpreter for the engine entry point [env: NETDISRUPT_PYTHON]
    #[arg(long)]
    pub interpreter: Option<PathBuf>,
    /// Engine entry point script [env: NETDISRUPT_ENTRYPOINT]
    #[arg(long)]
    pub entrypoint: Option<PathBuf>,
    /// Also run the mapping stage
    #[arg(long)]
    pub maps: bool,
    /// Kill a stage after this many seconds (0 = never)
    #[arg(long)]
    pub stage_timeout: Option<u64>,
    /// Keep the first match of each log field instead of the last
    #[arg(long)]
    pub first_match: bool,
}

/// Flags controlling how edges are disabled.
#[derive(Args, Debug, Clone, Default)]
pub struct InjectArgs {
    /// Disable the least important edges first
    #[arg(long)]
    pub ascending: bool,
    /// Route cost written to disabled edges
    #[arg(long)]
    pub sentinel: Option<f64>,
}

fn parse_policy(text: &str) -> Result<MatchPolicy> {
    match text.to_ascii_lowercase().as_str() {
        "first" => Ok(MatchPolicy::FirstMatch),
        "last" => Ok(MatchPolicy::LastMatch),
        other => Err(anyhow!("match_policy must be `first` or `last`, got `{other}`")),
    }
}

/// Resolve engine settings with `env` standing in for the process environment.
pub fn pipeline_config_with(
    file: &FileConfig,
    args: &EngineArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig> {
    let interpreter = args
        .interpreter
        .clone()
        .or_else(|| file.interpreter.clone())
        .or_else(|| env(ENV_INTERPRETER).map(PathBuf::from))
        .ok_or_else(|| anyhow!("no interpreter given (use --interpreter or {ENV_INTERPRETER})"))?;
    let entrypoint = args
        .entrypoint
        .clone()
        .or_else(|| file.entrypoint.clone())
        .or_else(|| env(ENV_ENTRYPOINT).map(PathBuf::from))
        .ok_or_else(|| anyhow!("no entry point given (use --entrypoint or {ENV_ENTRYPOINT})"))?;

    let policy = if args.first_match {
        MatchPolicy::FirstMatch
    } else {
        file.match_policy
            .as_deref()
            .map(parse_policy)
            .transpose()?
            .unwrap_or_default()
    };
    let timeout = args
        .stage_timeout
        .or(file.stage_timeout_secs)
        .map(Duration::from_secs);

    Ok(PipelineConfig::new(&interpreter, &entrypoint)?
        .with_maps(args.maps || file.make_maps.unwrap_or(false))
        .with_stage_timeout(timeout)
        .with_match_policy(policy))
}

pub fn pipeline_config(file: &FileConfig, args: &EngineArgs) -> Result<PipelineConfig> {
    pipeline_config_with(file, args, |key| std::env::var(key).ok())
}

pub fn inject_options(file: &FileConfig, args: &InjectArgs) -> Result<InjectOptions> {
    let defaults = InjectOptions::default();
    let options = InjectOptions {
        order: SortOrder::from_ascending(args.ascending || file.ascending.unwrap_or(false)),
        sentinel_cost: args
            .sentinel
            .or(file.sentinel_cost)
            .unwrap_or(defaults.sentinel_cost),
        namespace: file.namespace.clone().unwrap_or(defaults.namespace),
        retry: defaults.retry,
    };
    options.validate()?;
    Ok(options)
}

pub fn report_config(file: &FileConfig, workdir: Option<&Path>) -> ReportConfig {
    let defaults = ReportConfig::default();
    ReportConfig {
        renderer: file.renderer.clone().unwrap_or(defaults.renderer),
        script: file.report_script.clone().unwrap_or(defaults.script),
        workdir: workdir.map(Path::to_path_buf).unwrap_or(defaults.workdir),
        timeout: file.report_timeout_secs.map(Duration::from_secs),
    }
}
