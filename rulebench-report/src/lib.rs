#![warn(missing_docs)]
//! RuleBench Report - Outcome Aggregation and Output
//!
//! Collects per-(corpus, variant) outcomes and renders them:
//! - Summary text (one status line per pair)
//! - JSON (machine-readable)
//! - Human-readable terminal output with full diffs
//! - Duration summary file (one duration per line)

mod aggregate;
mod formatting;
mod json;
mod report;
mod summary_file;

pub use aggregate::Aggregator;
pub use formatting::{format_diff, format_human_output, format_seconds};
pub use json::generate_json_report;
pub use report::{
    BenchmarkOutcome, DiffSummary, OutcomeStatus, Report, ReportMeta, ReportSummary,
};
pub use summary_file::write_summary_file;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with full report
    Json,
    /// Status lines only
    Summary,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "summary" | "lines" => Ok(OutputFormat::Summary),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &Report, format: OutputFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Human => format_human_output(report),
        OutputFormat::Summary => report
            .outcomes
            .iter()
            .map(|o| format!("{}\n", o.line()))
            .collect(),
    })
}
