//! Baseline Diffing
//!
//! Compares a variant's findings with the baseline's findings for the same
//! corpus and decides how serious any difference is.

use crate::result::{FindingSet, RunResult};
use serde::{Deserialize, Serialize};

/// Asymmetric difference between a candidate and the baseline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingDiff {
    /// Present in the candidate, absent from the baseline
    pub extra: FindingSet,
    /// Present in the baseline, absent from the candidate
    pub missing: FindingSet,
}

impl FindingDiff {
    /// Both directions are empty
    pub fn is_equivalent(&self) -> bool {
        self.extra.is_empty() && self.missing.is_empty()
    }
}

/// Compute `candidate − baseline` and `baseline − candidate`
pub fn diff(candidate: &FindingSet, baseline: &FindingSet) -> FindingDiff {
    FindingDiff {
        extra: candidate.difference(baseline).cloned().collect(),
        missing: baseline.difference(candidate).cloned().collect(),
    }
}

/// Severity of a variant's outcome relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Same findings, no more errors
    Ok,
    /// Same findings, but strictly more parse/engine errors
    Warning,
    /// Different findings
    Error,
}

/// Result of checking one candidate run against the baseline run
#[derive(Debug, Clone)]
pub struct BaselineCheck {
    /// Overall verdict
    pub verdict: Verdict,
    /// Finding differences
    pub diff: FindingDiff,
    /// Candidate error count
    pub error_count: usize,
    /// Baseline error count
    pub baseline_error_count: usize,
}

impl BaselineCheck {
    /// One-line description of the check, without corpus/variant prefix
    pub fn describe(&self) -> String {
        match self.verdict {
            Verdict::Ok => "matches baseline".to_string(),
            Verdict::Warning => format!(
                "matches baseline but reports more errors ({} vs {} in baseline)",
                self.error_count, self.baseline_error_count
            ),
            Verdict::Error => format!(
                "findings differ from baseline: {} extra, {} missing",
                self.diff.extra.len(),
                self.diff.missing.len()
            ),
        }
    }
}

/// Compare a candidate run with the baseline run of the same corpus
pub fn check_against_baseline(candidate: &RunResult, baseline: &RunResult) -> BaselineCheck {
    let diff = diff(candidate.findings(), baseline.findings());
    let verdict = if !diff.is_equivalent() {
        Verdict::Error
    } else if candidate.error_count() > baseline.error_count() {
        Verdict::Warning
    } else {
        Verdict::Ok
    };

    BaselineCheck {
        verdict,
        diff,
        error_count: candidate.error_count(),
        baseline_error_count: baseline.error_count(),
    }
}
