//! Report Data Structures

use chrono::{DateTime, Utc};
use rulebench_core::{BaselineCheck, FindingSet, RunResult, Verdict};
use rulebench_stats::Throughput;
use serde::{Deserialize, Serialize};

/// Status of one (corpus, variant) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Ran cleanly and (for non-baseline variants) matched the baseline
    Ok,
    /// Usable, but with a warning: more errors than the baseline, or a
    /// partial parse failure reported by the tool
    Warning,
    /// Findings differ from the baseline
    Error,
    /// The pair could not produce a usable result
    Fatal,
    /// Ran, but the corpus has no baseline result to compare against
    BaselineUnavailable,
}

impl OutcomeStatus {
    /// Fixed-width label used in status lines
    pub fn label(self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "OK",
            OutcomeStatus::Warning => "WARNING",
            OutcomeStatus::Error => "ERROR",
            OutcomeStatus::Fatal => "FATAL",
            OutcomeStatus::BaselineUnavailable => "NOBASE",
        }
    }
}

/// Findings that differ from the baseline, as the tool emitted them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Findings only the candidate reported
    pub extra: Vec<serde_json::Value>,
    /// Findings only the baseline reported
    pub missing: Vec<serde_json::Value>,
}

impl DiffSummary {
    fn from_sets(extra: &FindingSet, missing: &FindingSet) -> Self {
        Self {
            extra: extra.iter().map(|f| f.original().clone()).collect(),
            missing: missing.iter().map(|f| f.original().clone()).collect(),
        }
    }
}

/// Outcome of one (corpus, variant) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    /// Corpus name
    pub corpus: String,
    /// Variant name
    pub variant: String,
    /// Whether this is the baseline variant
    pub baseline: bool,
    /// Verdict for the pair
    pub status: OutcomeStatus,
    /// Wall-clock duration of the tool invocation in seconds
    pub duration_s: Option<f64>,
    /// Number of normalized findings, when the output was usable
    pub findings: Option<usize>,
    /// Number of parse/engine errors, when the output was usable
    pub errors: Option<usize>,
    /// Human-readable detail (diff counts, failure reason, ...)
    pub message: String,
    /// Findings that differ from the baseline; ERROR outcomes only
    pub diff: Option<DiffSummary>,
    /// Throughput; baseline outcomes with a timing breakdown only
    pub throughput: Option<Throughput>,
}

impl BenchmarkOutcome {
    /// Outcome of a successful baseline run
    pub fn baseline(
        corpus: &str,
        variant: &str,
        duration_s: f64,
        result: &RunResult,
        throughput: Option<Throughput>,
        partial_parse: Option<i32>,
    ) -> Self {
        let mut outcome = Self::ran(corpus, variant, true, duration_s, result);
        outcome.message = "baseline".to_string();
        outcome.throughput = throughput;
        outcome.apply_partial_parse(partial_parse);
        outcome
    }

    /// Outcome of a non-baseline run checked against the baseline
    pub fn checked(
        corpus: &str,
        variant: &str,
        duration_s: f64,
        result: &RunResult,
        check: &BaselineCheck,
        partial_parse: Option<i32>,
    ) -> Self {
        let mut outcome = Self::ran(corpus, variant, false, duration_s, result);
        outcome.status = match check.verdict {
            Verdict::Ok => OutcomeStatus::Ok,
            Verdict::Warning => OutcomeStatus::Warning,
            Verdict::Error => OutcomeStatus::Error,
        };
        outcome.message = check.describe();
        if !check.diff.is_equivalent() {
            outcome.diff = Some(DiffSummary::from_sets(&check.diff.extra, &check.diff.missing));
        }
        outcome.apply_partial_parse(partial_parse);
        outcome
    }

    /// Outcome of a non-baseline run whose corpus has no baseline result
    pub fn baseline_unavailable(
        corpus: &str,
        variant: &str,
        duration_s: Option<f64>,
        result: Option<&RunResult>,
    ) -> Self {
        Self {
            corpus: corpus.to_string(),
            variant: variant.to_string(),
            baseline: false,
            status: OutcomeStatus::BaselineUnavailable,
            duration_s,
            findings: result.map(|r| r.findings().len()),
            errors: result.map(|r| r.error_count()),
            message: "baseline unavailable, not compared".to_string(),
            diff: None,
            throughput: None,
        }
    }

    /// Outcome of a pair that failed
    pub fn fatal(
        corpus: &str,
        variant: &str,
        baseline: bool,
        duration_s: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            corpus: corpus.to_string(),
            variant: variant.to_string(),
            baseline,
            status: OutcomeStatus::Fatal,
            duration_s,
            findings: None,
            errors: None,
            message: message.into(),
            diff: None,
            throughput: None,
        }
    }

    fn ran(corpus: &str, variant: &str, baseline: bool, duration_s: f64, result: &RunResult) -> Self {
        Self {
            corpus: corpus.to_string(),
            variant: variant.to_string(),
            baseline,
            status: OutcomeStatus::Ok,
            duration_s: Some(duration_s),
            findings: Some(result.findings().len()),
            errors: Some(result.error_count()),
            message: String::new(),
            diff: None,
            throughput: None,
        }
    }

    fn apply_partial_parse(&mut self, partial_parse: Option<i32>) {
        if let Some(code) = partial_parse {
            if self.status == OutcomeStatus::Ok {
                self.status = OutcomeStatus::Warning;
            }
            self.message
                .push_str(&format!(" (partial parse failure, exit code {code})"));
        }
    }

    /// One-line textual status
    pub fn line(&self) -> String {
        let mut line = format!(
            "{:<7} {}/{}:",
            self.status.label(),
            self.corpus,
            self.variant
        );
        if let Some(duration) = self.duration_s {
            line.push_str(&format!(" {duration:.3}s"));
        }
        if let (Some(findings), Some(errors)) = (self.findings, self.errors) {
            line.push_str(&format!(" [{findings} findings, {errors} errors]"));
        }
        if !self.message.is_empty() {
            line.push(' ');
            line.push_str(&self.message);
        }
        line
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// RuleBench version
    pub version: String,
    /// When the report was built
    pub timestamp: DateTime<Utc>,
    /// Commit of the working directory, if it is a git checkout
    pub git_commit: Option<String>,
    /// Tool command line prefix the corpuses were run with
    pub tool: Vec<String>,
    /// Operating system
    pub os: String,
    /// Logical CPU count
    pub cpu_cores: u32,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of outcomes
    pub total: usize,
    /// OK outcomes
    pub ok: usize,
    /// WARNING outcomes
    pub warnings: usize,
    /// ERROR outcomes
    pub errors: usize,
    /// FATAL outcomes
    pub fatal: usize,
    /// NOBASE outcomes
    pub baseline_unavailable: usize,
    /// Sum of all recorded tool durations in seconds
    pub total_duration_s: f64,
}

impl ReportSummary {
    /// Whether any pair failed outright
    pub fn has_fatal(&self) -> bool {
        self.fatal > 0
    }

    /// Whether any variant changed behavior
    pub fn has_regressions(&self) -> bool {
        self.errors > 0
    }
}

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Where and when the run happened
    pub meta: ReportMeta,
    /// Outcomes in execution order
    pub outcomes: Vec<BenchmarkOutcome>,
    /// Counts by status
    pub summary: ReportSummary,
}
