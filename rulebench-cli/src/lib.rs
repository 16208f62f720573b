#![warn(missing_docs)]
//! RuleBench CLI Library
//!
//! This module provides the command-line driver: configuration discovery,
//! corpus preparation, the process runner and the execution matrix.
//! Use `rulebench::run()` (or `rulebench_cli::run()`) in a main function to
//! get the full CLI.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     rulebench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod fetch;
mod planner;
mod prepare;
mod runner;
mod upload;

pub use config::*;
pub use executor::{CorpusRun, Matrix, MatrixConfig, build_report_meta};
pub use fetch::{FetchError, HttpRuleFetcher, RuleCache, RuleFetcher, cache_file_name};
pub use planner::{ExecutionPlan, build_plan};
pub use prepare::{CorpusPreparer, PrepareError, Preparer, materialize};
pub use runner::{PreparedCorpus, ProcessRunner, RawRun, RunError, Runner, RunnerSettings};
pub use upload::{DashboardClient, MetricsSink, UploadError, outcome_metrics, upload_results};

use clap::{Parser, Subcommand};
use regex::Regex;
use rulebench_core::{NormalizeOptions, RuleSource, TargetSource};
use rulebench_report::{
    Aggregator, OutputFormat, Report, generate_json_report, render, write_summary_file,
};
use rulebench_stats::RuleTimeTable;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// RuleBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "rulebench")]
#[command(
    author,
    version,
    about = "RuleBench - performance and behavior regression harness for rule-based code analyzers"
)]
pub struct Cli {
    /// Optional subcommand (List, Run, Prepare, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter corpuses by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Configuration file (discovered from rulebench.toml if not specified)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Run only this variant (repeatable; the baseline always runs)
    #[arg(long = "variant")]
    pub variants: Vec<String>,

    /// Output format: human, summary, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write one duration per line to this file
    #[arg(long)]
    pub summary_file: Option<PathBuf>,

    /// Write the per-rule time table as JSON to this file
    #[arg(long)]
    pub rule_times: Option<PathBuf>,

    /// Tool command line, e.g. "python3 -m semgrep"
    #[arg(long)]
    pub tool: Option<String>,

    /// Timeout per tool invocation, e.g. "30m"; "none" disables it
    #[arg(long)]
    pub timeout: Option<String>,

    /// Do not request the timing breakdown (disables throughput metrics)
    #[arg(long)]
    pub no_time: bool,

    /// Also compare metavariable bindings when diffing findings
    #[arg(long)]
    pub compare_bindings: bool,

    /// Number of corpuses run in parallel
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Cache directory for rule configs and corpus checkouts
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Dashboard base URL to upload metrics to
    #[arg(long)]
    pub dashboard: Option<String>,

    /// Skip uploading even if a dashboard is configured
    #[arg(long)]
    pub no_upload: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List corpuses and variants that would run
    List,
    /// Run the benchmark matrix (default)
    Run,
    /// Fetch rule configs and check out corpuses without running
    Prepare,
    /// Write a default rulebench.toml to the current directory
    Init,
}

/// Run the RuleBench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the RuleBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "rulebench=debug"
    } else {
        "rulebench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Init) = cli.command {
        return init_config();
    }

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::List) => list_plan(&cli, &config),
        Some(Commands::Prepare) => prepare_corpora(&cli, &config),
        Some(Commands::Run) | None => run_benchmarks(&cli, &config),
        Some(Commands::Init) => Ok(()),
    }
}

/// Load the explicit or discovered configuration (CLI flags override it later)
fn load_config(cli: &Cli) -> anyhow::Result<BenchConfig> {
    let (mut config, root) = match &cli.config {
        Some(path) => {
            let config = BenchConfig::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?;
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (config, root)
        }
        None => match BenchConfig::discover() {
            Some(loaded) => loaded?,
            None => (BenchConfig::default(), std::env::current_dir()?),
        },
    };
    config.resolve_paths(&root);
    config.validate_corpora()?;
    Ok(config)
}

fn init_config() -> anyhow::Result<()> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", CONFIG_FILE));
    }
    std::fs::write(path, BenchConfig::default_toml())?;
    println!("Wrote {}", CONFIG_FILE);
    Ok(())
}

fn plan(cli: &Cli, config: &BenchConfig) -> anyhow::Result<ExecutionPlan> {
    let filter = Regex::new(&cli.filter)
        .map_err(|e| anyhow::anyhow!("Invalid corpus filter '{}': {}", cli.filter, e))?;
    let catalog = config.catalog()?;
    let plan = build_plan(&config.corpora, &catalog, Some(&filter), &cli.variants);
    for name in &plan.unknown_variants {
        eprintln!("Warning: variant '{}' is not in the catalog", name);
    }
    Ok(plan)
}

fn list_plan(cli: &Cli, config: &BenchConfig) -> anyhow::Result<()> {
    let plan = plan(cli, config)?;

    println!("RuleBench Plan:");
    println!("├── corpuses");
    for corpus in &plan.corpora {
        let rules = match &corpus.rules {
            RuleSource::Path { path } => path.display().to_string(),
            RuleSource::Registry { registry } => registry.join(", "),
        };
        let target = match &corpus.target {
            TargetSource::Path { path } => path.display().to_string(),
            TargetSource::Git { git, commit } => format!("{git}@{commit}"),
        };
        println!("│   ├── {} (rules: {}; target: {})", corpus.name, rules, target);
    }
    println!("├── variants");
    for variant in plan.catalog.execution_order() {
        let mut opts = Vec::new();
        if !variant.engine_opts.is_empty() {
            opts.push(format!("engine: {}", variant.engine_opts));
        }
        if !variant.tool_opts.is_empty() {
            opts.push(format!("tool: {}", variant.tool_opts));
        }
        let baseline = if variant.is_baseline() { " [baseline]" } else { "" };
        let opts = if opts.is_empty() {
            String::new()
        } else {
            format!(" ({})", opts.join("; "))
        };
        println!("│   ├── {}{}{}", variant.name, baseline, opts);
    }
    println!(
        "{} corpuses × {} variants = {} runs.",
        plan.corpora.len(),
        plan.catalog.len(),
        plan.pair_count()
    );
    Ok(())
}

fn build_preparer(cli: &Cli, config: &BenchConfig) -> anyhow::Result<CorpusPreparer> {
    let fetch_timeout = Duration::from_nanos(BenchConfig::parse_duration(&config.cache.fetch_timeout)?);
    let fetcher = HttpRuleFetcher::new(&config.cache.rules_url, fetch_timeout)?;
    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.cache.directory));
    Ok(CorpusPreparer::new(&cache_dir, Box::new(fetcher)))
}

fn prepare_corpora(cli: &Cli, config: &BenchConfig) -> anyhow::Result<()> {
    let plan = plan(cli, config)?;
    let preparer = build_preparer(cli, config)?;

    let mut failures = 0;
    for corpus in &plan.corpora {
        match preparer.prepare(corpus) {
            Ok(prepared) => println!(
                "OK      {}: {} rule config(s), target {}",
                prepared.name,
                prepared.rules.len(),
                prepared.target.display()
            ),
            Err(e) => {
                println!("FATAL   {}: {}", corpus.name, e);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        eprintln!("\n{} corpus(es) could not be prepared", failures);
        std::process::exit(1);
    }
    Ok(())
}

/// Build runner settings by layering: rulebench.toml defaults → CLI overrides.
fn build_runner_settings(cli: &Cli, config: &BenchConfig) -> anyhow::Result<RunnerSettings> {
    let tool: Vec<String> = match &cli.tool {
        Some(tool) => tool.split_whitespace().map(str::to_string).collect(),
        None => config.runner.tool.clone(),
    };
    if tool.is_empty() {
        return Err(anyhow::anyhow!("Tool command line is empty"));
    }

    let timeout = cli.timeout.as_deref().unwrap_or(&config.runner.timeout);
    Ok(RunnerSettings {
        tool,
        engine_env: config.runner.engine_env.clone(),
        timeout: BenchConfig::parse_timeout(timeout)?,
        partial_exit_code: config.runner.partial_exit_code,
        request_timings: config.runner.time && !cli.no_time,
    })
}

fn run_benchmarks(cli: &Cli, config: &BenchConfig) -> anyhow::Result<()> {
    let plan = plan(cli, config)?;
    if plan.corpora.is_empty() {
        println!("No corpuses found.");
        return Ok(());
    }

    let format: OutputFormat = match &cli.format {
        Some(format) => format.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.output.format.parse().unwrap_or(OutputFormat::Human),
    };

    // CLI wins, then rulebench.toml, then 1
    let jobs = cli.jobs.or(config.runner.jobs).unwrap_or(1).max(1);

    let settings = build_runner_settings(cli, config)?;
    let tool = settings.tool.clone();
    let runner = ProcessRunner::new(settings);
    let preparer = build_preparer(cli, config)?;

    if format == OutputFormat::Human {
        println!(
            "Running {} corpuses × {} variants ({} runs), {} job(s)...\n",
            plan.corpora.len(),
            plan.catalog.len(),
            plan.pair_count(),
            jobs
        );
    }

    let matrix_config = MatrixConfig {
        normalize: NormalizeOptions {
            compare_bindings: cli.compare_bindings,
        },
        jobs,
        show_progress: !cli.no_progress,
    };
    let runs = Matrix::new(&runner, &preparer, &plan.catalog, matrix_config).run(&plan.corpora)?;

    let mut aggregator = Aggregator::new();
    let mut rule_times = RuleTimeTable::new();
    for run in &runs {
        aggregator.extend(run.outcomes.iter().cloned());
        if let Some(timings) = &run.baseline_timings {
            rule_times.record(&run.corpus, timings);
        }
    }

    let durations = aggregator.durations();
    let report = aggregator.into_report(build_report_meta(&tool));

    // Generate output
    let output = render(&report, format)?;
    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    write_artifacts(cli, config, &report, &durations, &rule_times)?;

    let dashboard = cli.dashboard.clone().or_else(|| config.upload.dashboard.clone());
    if let Some(dashboard) = dashboard.filter(|_| !cli.no_upload) {
        let timeout = Duration::from_nanos(BenchConfig::parse_duration(&config.upload.timeout)?);
        match DashboardClient::new(&dashboard, timeout) {
            Ok(client) => {
                let failures = upload_results(&client, &runs);
                if failures > 0 {
                    eprintln!("Warning: {} upload(s) to {} failed", failures, dashboard);
                }
            }
            Err(e) => eprintln!("Warning: cannot upload to {}: {}", dashboard, e),
        }
    }

    // Exit with appropriate code
    let summary = &report.summary;
    let fail_on_regression = config.ci.fail_on_regression && summary.has_regressions();
    if summary.has_fatal() || fail_on_regression {
        if summary.has_fatal() {
            eprintln!("\n{} run(s) failed", summary.fatal);
        }
        if fail_on_regression {
            eprintln!("\n{} run(s) differ from the baseline", summary.errors);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Write the summary file, rule time table and JSON report when requested
fn write_artifacts(
    cli: &Cli,
    config: &BenchConfig,
    report: &Report,
    durations: &[f64],
    rule_times: &RuleTimeTable,
) -> anyhow::Result<()> {
    let summary_file = cli
        .summary_file
        .clone()
        .or_else(|| config.output.summary_file.as_ref().map(PathBuf::from));
    if let Some(path) = summary_file {
        write_summary_file(&path, durations)?;
    }

    let rule_times_file = cli
        .rule_times
        .clone()
        .or_else(|| config.output.rule_times.as_ref().map(PathBuf::from));
    if let Some(path) = rule_times_file {
        if rule_times.is_empty() {
            eprintln!("Warning: no per-rule timings were collected; writing an empty table");
        }
        write_file(&path, &rule_times.to_json()?)?;
    }

    if let Some(path) = config.output.report.as_ref().map(PathBuf::from) {
        write_file(&path, &generate_json_report(report)?)?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)
}
