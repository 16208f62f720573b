#![warn(missing_docs)]
//! RuleBench Stats - Performance Metrics
//!
//! Derived performance numbers for baseline runs:
//! - Throughput (bytes/s and lines/s, normalized by rule count)
//! - Per-rule time tables across corpuses

mod rule_times;
mod throughput;

pub use rule_times::{CorpusRuleTimes, RuleTime, RuleTimeReport, RuleTimeTable};
pub use throughput::{
    Throughput, ThroughputError, compute_throughput, compute_throughput_in, count_lines,
};
