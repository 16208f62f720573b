//! Human-Readable Output
//!
//! Renders a report for the terminal:
//! - One status line per (corpus, variant), grouped by corpus
//! - Baseline throughput when available
//! - For every ERROR outcome, the extra and missing findings in full
//! - A closing summary

use crate::report::{BenchmarkOutcome, OutcomeStatus, Report};

/// Format seconds with a unit suited to the magnitude
pub fn format_seconds(seconds: f64) -> String {
    if seconds < 1e-3 {
        format!("{:.2} µs", seconds * 1e6)
    } else if seconds < 1.0 {
        format!("{:.2} ms", seconds * 1e3)
    } else if seconds < 120.0 {
        format!("{seconds:.2} s")
    } else {
        format!("{:.2} min", seconds / 60.0)
    }
}

/// Format a report for terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("RuleBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let mut current_corpus: Option<&str> = None;
    for outcome in &report.outcomes {
        if current_corpus != Some(outcome.corpus.as_str()) {
            if current_corpus.is_some() {
                output.push('\n');
            }
            output.push_str(&format!("Corpus: {}\n", outcome.corpus));
            output.push_str(&"-".repeat(60));
            output.push('\n');
            current_corpus = Some(outcome.corpus.as_str());
        }

        output.push_str(&format!("  {}\n", outcome.line()));

        if let Some(tp) = &outcome.throughput {
            output.push_str(&format!(
                "      throughput: {:.2} bytes/s  {:.2} lines/s  ({} lines)\n",
                tp.bytes_per_second, tp.lines_per_second, tp.total_lines
            ));
        }

        if outcome.status == OutcomeStatus::Error {
            output.push_str(&format_diff(outcome));
        }
    }

    let summary = &report.summary;
    output.push('\n');
    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  {} runs: {} ok, {} warnings, {} errors, {} fatal, {} without baseline\n",
        summary.total,
        summary.ok,
        summary.warnings,
        summary.errors,
        summary.fatal,
        summary.baseline_unavailable
    ));
    output.push_str(&format!(
        "  total tool time: {}\n",
        format_seconds(summary.total_duration_s)
    ));

    output
}

/// Both directions of an outcome's diff, with counts and full records
pub fn format_diff(outcome: &BenchmarkOutcome) -> String {
    let mut output = String::new();
    let Some(diff) = &outcome.diff else {
        return output;
    };

    let sections = [
        ("extra (not in baseline)", &diff.extra),
        ("missing (only in baseline)", &diff.missing),
    ];
    for (title, findings) in sections {
        output.push_str(&format!("      {}: {}\n", title, findings.len()));
        for finding in findings {
            let rendered =
                serde_json::to_string_pretty(finding).unwrap_or_else(|_| finding.to_string());
            for line in rendered.lines() {
                output.push_str("        ");
                output.push_str(line);
                output.push('\n');
            }
        }
    }
    output
}
