//! Run Results
//!
//! Parses the analysis tool's JSON document into a [`RunResult`]: the
//! normalized finding set, the engine error count and the optional timing
//! breakdown.
//!
//! Expected shape:
//!
//! ```text
//! {
//!   "errors":  [ ... ],
//!   "results": [ { "check_id", "path", "start", "end", "extra" }, ... ],
//!   "time":    { "rules": [{"id"}], "total_time", "total_bytes",
//!                "targets": [{"path", "parse_times", ...}] }      (optional)
//! }
//! ```

use crate::error::CoreError;
use crate::finding::{NormalizeOptions, NormalizedFinding};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A set of normalized findings, iterated in display order
pub type FindingSet = BTreeSet<NormalizedFinding>;

/// Per-rule entry of the timing breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTiming {
    /// Rule identifier
    pub id: String,
    /// Fields this harness does not interpret
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Per-target entry of the timing breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetTiming {
    /// Path of the scanned file
    pub path: String,
    /// Parse time per rule, aligned with [`Timings::rules`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_times: Vec<f64>,
    /// Match time per rule, aligned with [`Timings::rules`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_times: Vec<f64>,
    /// Total time spent on this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<f64>,
    /// Fields this harness does not interpret
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Timing breakdown reported by the tool when run with timing enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    /// Rules that were run
    pub rules: Vec<RuleTiming>,
    /// Total elapsed time in seconds, aggregated over all rules and targets
    pub total_time: f64,
    /// Total bytes scanned
    pub total_bytes: u64,
    /// Per-file breakdown
    #[serde(default)]
    pub targets: Vec<TargetTiming>,
    /// Fields this harness does not interpret (forwarded to the stats sink)
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Timings {
    /// Number of rules in the breakdown
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Outcome of one tool invocation, normalized for comparison
#[derive(Debug, Clone)]
pub struct RunResult {
    findings: FindingSet,
    error_count: usize,
    timings: Option<Timings>,
}

impl RunResult {
    /// Assemble a result from parts
    pub fn new(findings: FindingSet, error_count: usize, timings: Option<Timings>) -> Self {
        Self {
            findings,
            error_count,
            timings,
        }
    }

    /// Normalized findings
    pub fn findings(&self) -> &FindingSet {
        &self.findings
    }

    /// Number of parse/engine errors reported
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Timing breakdown, when requested and present
    pub fn timings(&self) -> Option<&Timings> {
        self.timings.as_ref()
    }
}

/// Parse and normalize the tool's raw output
///
/// Fails with [`CoreError::MalformedOutput`] when the payload is not a JSON
/// object, lacks `errors` or `results`, or lacks `time` while
/// `expect_timings` is set.
pub fn normalize(
    raw: &[u8],
    expect_timings: bool,
    options: NormalizeOptions,
) -> Result<RunResult, CoreError> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| CoreError::malformed(format!("invalid JSON: {e}"), raw))?;
    let Some(object) = document.as_object() else {
        return Err(CoreError::malformed("top-level value is not an object", raw));
    };

    let errors = object
        .get("errors")
        .ok_or_else(|| CoreError::malformed("missing key 'errors'", raw))?;
    let results = object
        .get("results")
        .ok_or_else(|| CoreError::malformed("missing key 'results'", raw))?;

    let error_count = match errors {
        Value::Array(items) => items.len(),
        _ => return Err(CoreError::malformed("'errors' is not an array", raw)),
    };
    let findings: FindingSet = match results {
        Value::Array(items) => items
            .iter()
            .map(|item| NormalizedFinding::new(item, options))
            .collect(),
        _ => return Err(CoreError::malformed("'results' is not an array", raw)),
    };

    let timings = match object.get("time") {
        Some(time) => Some(
            serde_json::from_value::<Timings>(time.clone())
                .map_err(|e| CoreError::malformed(format!("invalid 'time' section: {e}"), raw))?,
        ),
        None if expect_timings => {
            return Err(CoreError::malformed(
                "missing key 'time' (timing was requested)",
                raw,
            ));
        }
        None => None,
    };

    Ok(RunResult::new(findings, error_count, timings))
}
