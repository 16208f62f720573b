#![warn(missing_docs)]
//! # RuleBench
//!
//! Correctness and performance benchmark harness for rule-based static
//! analysis tools.
//!
//! RuleBench runs an analyzer over a matrix of corpuses and engine
//! configurations ("variants"):
//! - **Behavior Regression**: every variant's findings are compared against
//!   the baseline variant after normalization; any difference is an ERROR
//! - **Error Drift**: more tool-reported errors with identical findings is a WARNING
//! - **Throughput**: bytes/s and lines/s per rule from the baseline's timing breakdown
//! - **Per-Rule Timing**: parse time per rule per corpus, averaged across corpuses
//! - **Failure Isolation**: crashes, timeouts and garbled output are FATAL
//!   for one pair and never stop the matrix
//! - **Reporting**: status lines, JSON report, duration summary file, dashboard upload
//!
//! ## Quick Start
//!
//! ```ignore
//! // rulebench.toml
//! // [[corpus]]
//! // name = "flask"
//! // rules = { registry = ["p/flask"] }
//! // target = { git = "https://github.com/pallets/flask", commit = "2.0.0" }
//!
//! fn main() -> anyhow::Result<()> {
//!     rulebench::run()
//! }
//! ```

// Re-export core types
pub use rulebench_core::{
    BASELINE_VARIANT, BaselineCheck, CoreError, Corpus, FindingDiff, FindingSet,
    NormalizeOptions, NormalizedFinding, RuleSource, RunResult, TargetSource, Timings, Variant,
    VariantCatalog, Verdict, check_against_baseline, diff, mask_finding, normalize,
};

// Re-export stats
pub use rulebench_stats::{
    RuleTimeReport, RuleTimeTable, Throughput, ThroughputError, compute_throughput,
};

// Re-export reporting
pub use rulebench_report::{
    Aggregator, BenchmarkOutcome, OutcomeStatus, OutputFormat, Report, ReportSummary, render,
};

// Re-export the driver
pub use rulebench_cli::{
    BenchConfig, Cli, CorpusPreparer, CorpusRun, Matrix, MatrixConfig, PreparedCorpus,
    Preparer, ProcessRunner, RawRun, RunError, Runner, RunnerSettings,
};

/// Run the RuleBench CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() {
///     rulebench::run().unwrap();
/// }
/// ```
pub use rulebench_cli::run;
