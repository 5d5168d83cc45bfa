//! netdisrupt CLI
//!
//! Resiliency analysis for a completed freight-network scenario:
//! - Building a routable graph from a GIS feature store
//! - Scoring network evenness from a scenario database
//! - Preparing, disrupting and re-running `disruptNN` copies of a baseline
//! - Compiling the HTML results report

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use netdisrupt_graph::{read_feature_store, read_feature_store_strict};
use netdisrupt_metrics::{evenness_from_db, DEFAULT_MODE};
use netdisrupt_pipeline::{compile_report, run_disruption_steps, ReportOutcome};
use netdisrupt_scenario::{
    disrupt_network, load_importance, make_disruption_scenarios, DisruptionType, ScenarioLayout,
};

mod config;

use config::{EngineArgs, FileConfig, InjectArgs};

#[derive(Parser)]
#[command(name = "netdisrupt")]
#[command(author, version, about = "netdisrupt: progressive link-removal resiliency analysis")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Which ladder of scenarios to work on.
#[derive(Args, Debug, Clone)]
struct StepArgs {
    /// Edge ranking: BC (betweenness) or V (volume)
    #[arg(long = "type", short = 't')]
    kind: DisruptionType,
    /// Number of disruption steps
    #[arg(long, short = 'n')]
    steps: u32,
    /// Completed baseline scenario directory
    baseline: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the baseline into `disrupt01..disruptNN`.
    Prepare {
        #[command(flatten)]
        steps: StepArgs,
    },

    /// Disable the top-ranked edges in each prepared step.
    Disrupt {
        #[command(flatten)]
        steps: StepArgs,
        /// CSV with `edge_id,sum_BC,volume`
        #[arg(long)]
        importance: PathBuf,
        #[command(flatten)]
        inject: InjectArgs,
    },

    /// Run the engine over every step and write `Results.csv`.
    Run {
        #[command(flatten)]
        steps: StepArgs,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// prepare + disrupt + run, optionally followed by the report.
    All {
        #[command(flatten)]
        steps: StepArgs,
        #[arg(long)]
        importance: PathBuf,
        #[command(flatten)]
        inject: InjectArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Compile the report afterwards
        #[arg(long)]
        report: bool,
        /// Do not open the compiled report
        #[arg(long)]
        no_open: bool,
    },

    /// Evenness of a scenario's edge table.
    Evenness {
        /// Scenario database (main.db)
        db: PathBuf,
        #[arg(long, default_value = DEFAULT_MODE)]
        mode: String,
        /// Also write the table as CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build the network graph of one layer of a feature store.
    Graph {
        /// Directory of `.geojson` layers
        store: PathBuf,
        layer: String,
        /// Fail if the layer is missing
        #[arg(long)]
        strict: bool,
        /// Write the edge list as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render the HTML results report.
    Report {
        /// Baseline scenario name passed to the renderer
        baseline_id: String,
        /// Directory to run the renderer in
        #[arg(long)]
        workdir: Option<PathBuf>,
        #[arg(long)]
        no_open: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let file = FileConfig::load_optional(cli.config.as_deref())?;

    match cli.command {
        Commands::Prepare { steps } => cmd_prepare(&steps)?,
        Commands::Disrupt {
            steps,
            importance,
            inject,
        } => cmd_disrupt(&file, &steps, &importance, &inject).await?,
        Commands::Run { steps, engine } => cmd_run(&file, &steps, &engine).await?,
        Commands::All {
            steps,
            importance,
            inject,
            engine,
            report,
            no_open,
        } => {
            // Settings are checked before anything is copied.
            let pipeline = config::pipeline_config(&file, &engine)?;
            config::inject_options(&file, &inject)?;
            cmd_prepare(&steps)?;
            cmd_disrupt(&file, &steps, &importance, &inject).await?;
            run_steps(&steps, &pipeline).await?;
            if report {
                let baseline_id = ScenarioLayout::new(&steps.baseline, steps.kind).baseline_name();
                cmd_report(&file, &baseline_id, None, no_open).await?;
            }
        }
        Commands::Evenness { db, mode, out } => cmd_evenness(&db, &mode, out.as_deref()).await?,
        Commands::Graph {
            store,
            layer,
            strict,
            out,
        } => cmd_graph(&store, &layer, strict, out.as_deref())?,
        Commands::Report {
            baseline_id,
            workdir,
            no_open,
        } => cmd_report(&file, &baseline_id, workdir.as_deref(), no_open).await?,
    }
    Ok(())
}

fn cmd_prepare(args: &StepArgs) -> Result<()> {
    println!(
        "{} {} step(s) of {} ({})",
        "Preparing".green().bold(),
        args.steps,
        args.baseline.display(),
        args.kind
    );
    let summary = make_disruption_scenarios(args.kind, args.steps, &args.baseline)?;
    println!(
        "  {} {} ({} scenarios)",
        "→".cyan(),
        summary.root.display(),
        summary.scenarios.len()
    );
    Ok(())
}

async fn cmd_disrupt(file: &FileConfig, args: &StepArgs, importance: &Path, inject: &InjectArgs) -> Result<()> {
    let options = config::inject_options(file, inject)?;
    let records = load_importance(importance)
        .with_context(|| format!("loading edge importance from {}", importance.display()))?;
    println!(
        "{} {} step(s) by {} ({} ranked edges)",
        "Disrupting".green().bold(),
        args.steps,
        args.kind.metric_column(),
        records.len()
    );
    let applied = disrupt_network(args.kind, args.steps, &args.baseline, &records, &options).await?;
    for step in &applied {
        println!(
            "  {} {}: {} edge(s) disabled, {} row(s) updated",
            "→".cyan(),
            step.name,
            step.disabled_edges.len(),
            step.rows_updated
        );
    }
    Ok(())
}

async fn cmd_run(file: &FileConfig, args: &StepArgs, engine: &EngineArgs) -> Result<()> {
    let pipeline = config::pipeline_config(file, engine)?;
    run_steps(args, &pipeline).await
}

async fn run_steps(args: &StepArgs, pipeline: &netdisrupt_pipeline::PipelineConfig) -> Result<()> {
    println!(
        "{} engine over {} step(s) [{}]",
        "Running".green().bold(),
        args.steps,
        pipeline
            .stages()
            .iter()
            .map(|s| s.code())
            .collect::<Vec<_>>()
            .join(" ")
    );
    let table = run_disruption_steps(args.kind, args.steps, &args.baseline, pipeline).await?;
    print!("{table}");
    println!("  {} {}", "→".cyan(), table.path.display());
    Ok(())
}

async fn cmd_evenness(db: &Path, mode: &str, out: Option<&Path>) -> Result<()> {
    let report = evenness_from_db(db, mode)
        .await
        .with_context(|| format!("computing evenness for {}", db.display()))?;
    println!(
        "{} mode `{}` ({} edges)",
        "Evenness".green().bold(),
        report.mode,
        report.edge_count
    );
    print!("{report}");
    if let Some(out) = out {
        report.write_csv(out)?;
        println!("  {} {}", "→".cyan(), out.display());
    }
    Ok(())
}

fn cmd_graph(store: &Path, layer: &str, strict: bool, out: Option<&Path>) -> Result<()> {
    let graph = if strict {
        read_feature_store_strict(store, layer)?
    } else {
        read_feature_store(store, layer)?
    };
    let summary = graph.summary();
    println!(
        "{} layer `{}`: {} nodes, {} edges ({} parallel)",
        "Graph".green().bold(),
        layer,
        summary.nodes,
        summary.edges,
        summary.parallel_edges
    );
    if let Some(out) = out {
        let json = serde_json::to_string_pretty(&graph.to_edge_list())?;
        fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
        println!("  {} {}", "→".cyan(), out.display());
    }
    Ok(())
}

async fn cmd_report(file: &FileConfig, baseline_id: &str, workdir: Option<&Path>, no_open: bool) -> Result<()> {
    let report = config::report_config(file, workdir);
    println!("{} report for {}", "Compiling".green().bold(), baseline_id);
    let outcome = compile_report(&report, baseline_id).await?;
    print_outcome(&outcome);
    if !no_open && outcome.viewable() {
        if let Err(err) = open::that(&outcome.html_path) {
            tracing::warn!("could not open {}: {err}", outcome.html_path.display());
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ReportOutcome) {
    if outcome.succeeded() {
        println!("  {} {}", "→".cyan(), outcome.html_path.display());
    } else if outcome.had_errors {
        println!("  {} renderer reported errors; see log above", "!".red().bold());
    } else {
        println!("  {} renderer exited with {}", "!".yellow().bold(), outcome.status);
    }
}
