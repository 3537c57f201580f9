//! Command-line interface parsing and handling
//!
//! `toolprobe` with no subcommand runs the probe suite; `models` lists what
//! the endpoint offers and `config` shows or initializes the settings file.

pub mod model_list;
pub mod summary;


use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::cli::model_list::list_models;
use crate::cli::summary::print_summary;
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::probes::ProbeMode;
use crate::core::report::{FullReport, ReportMetadata, RunSummary};
use crate::core::runner::Runner;
use crate::utils::logging::init_tracing;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "toolprobe")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Probe an OpenAI-compatible endpoint for reliable tool calling")]
#[command(
    long_about = "toolprobe lists the models served by an OpenAI-compatible endpoint, runs a \
battery of tool-calling probes against each one, scores the results and classifies every \
model as recommended, partial support or no tool calling.\n\n\
Configuration is layered: built-in defaults, then the config file, then environment \
variables, then command-line flags.\n\n\
Environment Variables:\n\
  MODEL_TESTER_API_URL       API base URL including /v1\n\
  MODEL_TESTER_API_KEY       Bearer token sent with every request\n\
  MODEL_TESTER_TIMEOUT       Per-request timeout in seconds\n\
  MODEL_TESTER_MAX_WORKERS   Models probed concurrently\n\
  MODEL_TESTER_MAX_RETRIES   Attempts per request, including the first\n\
  MODEL_TESTER_RETRY_DELAY   Base backoff in seconds\n\
  MODEL_TESTER_OUTPUT_DIR    Directory for JSON reports\n\
  RUST_LOG                   Log filter (default toolprobe=info)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to load instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API base URL (default: http://localhost:8317/v1)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Maximum models probed in parallel (default: 5)
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Only probe models whose id matches this regex
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Quick mode: only test basic tool calling
    #[arg(long)]
    pub quick: bool,

    /// Directory for the JSON report (default: output)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the console summary without writing a report file
    #[arg(long)]
    pub no_report: bool,
}

impl RunArgs {
    /// Combines flags given after `run` with those given before it. Flags
    /// after the subcommand win.
    pub fn merged_with(self, outer: &RunArgs) -> RunArgs {
        RunArgs {
            max_workers: self.max_workers.or(outer.max_workers),
            filter: self.filter.or_else(|| outer.filter.clone()),
            quick: self.quick || outer.quick,
            output_dir: self.output_dir.or_else(|| outer.output_dir.clone()),
            no_report: self.no_report || outer.no_report,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Probe every selected model (the default)
    Run(RunArgs),
    /// List the endpoint's models and which ones a run would probe
    Models {
        /// Only select models whose id matches this regex
        #[arg(long, value_name = "REGEX")]
        filter: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the config file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

/// Flags override everything loaded from file and environment.
fn apply_overrides(config: &mut Config, api_url: Option<&str>, run: &RunArgs) {
    if let Some(url) = api_url {
        config.api_url = url.to_string();
    }
    if let Some(max_workers) = run.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(output_dir) = &run.output_dir {
        config.output_dir = output_dir.clone();
    }
}

fn load_config(args: &Args, run: &RunArgs) -> Result<Config, Box<dyn Error>> {
    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, args.api_url.as_deref(), run);
    config.validate()?;
    Ok(config)
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

/// Run flags given before `models` or `config` are an error.
fn reject_run_flags(args: &Args, subcommand: &str) -> Result<(), Box<dyn Error>> {
    if args.run == RunArgs::default() {
        return Ok(());
    }
    Err(format!(
        "Run flags such as --quick or --filter cannot be combined with `{subcommand}`"
    )
    .into())
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    match &args.command {
        None => probe_models(&args, args.run.clone()).await,
        Some(Commands::Run(run)) => probe_models(&args, run.clone().merged_with(&args.run)).await,
        Some(Commands::Models { filter }) => {
            reject_run_flags(&args, "models")?;
            let config = load_config(&args, &RunArgs::default())?;
            let model_filter = config.model_filter(filter.as_deref())?;
            list_models(&config, &model_filter).await
        }
        Some(Commands::Config { init }) => {
            reject_run_flags(&args, "config")?;
            show_config(&args, *init)
        }
    }
}

async fn probe_models(args: &Args, run: RunArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(args, &run)?;
    let mode = if run.quick {
        ProbeMode::Quick
    } else {
        ProbeMode::Full
    };

    let runner = Runner::from_config(&config, mode, run.filter.as_deref())?.with_progress(true);
    let outcome = runner.run().await?;

    if outcome.results.is_empty() {
        println!("No results to report");
        return Ok(());
    }

    let summary = RunSummary::from_results(
        runner.api_url(),
        outcome.candidates,
        &outcome.results,
        Utc::now(),
    );
    print_summary(&summary, &outcome.results);

    if run.no_report {
        return Ok(());
    }

    let report = FullReport {
        summary,
        results: outcome.results,
        metadata: ReportMetadata {
            api_url: config.api_url.clone(),
            quick_mode: run.quick,
            test_weights: runner.scorer().config().describe_weights(),
            filter_pattern: run.filter.clone(),
            max_workers: config.max_workers,
        },
    };
    let path = report.write_to_dir(&config.output_dir, Local::now())?;
    info!(path = %path_display(&path), "Report written");
    println!("\n📄 Full report saved to: {}", path_display(&path));
    Ok(())
}

fn show_config(args: &Args, init: bool) -> Result<(), Box<dyn Error>> {
    let path = match args.config.clone().or_else(Config::default_config_path) {
        Some(path) => path,
        None => return Err("Could not determine a config file location".into()),
    };

    if init {
        if path.exists() {
            println!("Config already exists at {}", path_display(&path));
        } else {
            Config::default().save_to_path(&path)?;
            println!("✅ Wrote default config to {}", path_display(&path));
        }
    }

    let mut config = Config::load_from_path(&path)?;
    config.apply_process_env()?;
    apply_overrides(&mut config, args.api_url.as_deref(), &RunArgs::default());

    println!("Config file: {}", path_display(&path));
    config.print_all();
    Ok(())
}
