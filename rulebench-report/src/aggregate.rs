//! Outcome Aggregation
//!
//! Outcomes are appended in traversal order and never reordered or removed,
//! so the summary text and the duration list read in the order the matrix
//! ran.

use crate::report::{BenchmarkOutcome, OutcomeStatus, Report, ReportMeta, ReportSummary};

/// Append-only collector of benchmark outcomes
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    outcomes: Vec<BenchmarkOutcome>,
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome
    pub fn record(&mut self, outcome: BenchmarkOutcome) {
        self.outcomes.push(outcome);
    }

    /// Append several outcomes, preserving their order
    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = BenchmarkOutcome>) {
        self.outcomes.extend(outcomes);
    }

    /// Outcomes recorded so far
    pub fn outcomes(&self) -> &[BenchmarkOutcome] {
        &self.outcomes
    }

    /// Recorded durations in traversal order (pairs without one are skipped)
    pub fn durations(&self) -> Vec<f64> {
        self.outcomes.iter().filter_map(|o| o.duration_s).collect()
    }

    /// Concatenation of all outcome lines
    pub fn summary_text(&self) -> String {
        let mut text = String::new();
        for outcome in &self.outcomes {
            text.push_str(&outcome.line());
            text.push('\n');
        }
        text
    }

    /// Counts per status
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.outcomes.len(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Ok => summary.ok += 1,
                OutcomeStatus::Warning => summary.warnings += 1,
                OutcomeStatus::Error => summary.errors += 1,
                OutcomeStatus::Fatal => summary.fatal += 1,
                OutcomeStatus::BaselineUnavailable => summary.baseline_unavailable += 1,
            }
            summary.total_duration_s += outcome.duration_s.unwrap_or(0.0);
        }
        summary
    }

    /// Finish aggregation into a report
    pub fn into_report(self, meta: ReportMeta) -> Report {
        let summary = self.summary();
        Report {
            meta,
            outcomes: self.outcomes,
            summary,
        }
    }
}
