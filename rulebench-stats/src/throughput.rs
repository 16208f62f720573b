//! Throughput Metrics
//!
//! Derives bytes/s and lines/s from the baseline run's timing breakdown.
//! `total_time` aggregates over every rule run against every target, so both
//! rates are normalized by the rule count.

use rayon::prelude::*;
use rulebench_core::Timings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Preconditions of [`compute_throughput`] that did not hold
#[derive(Debug, Error, PartialEq)]
pub enum ThroughputError {
    /// `total_time` was zero, negative or NaN
    #[error("total_time must be positive, got {0}")]
    NonPositiveTime(f64),

    /// The rule count used for normalization was zero
    #[error("timing breakdown lists no rules")]
    NoRules,
}

/// Throughput of one baseline run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    /// Bytes scanned per second per rule
    pub bytes_per_second: f64,
    /// Source lines scanned per second per rule
    pub lines_per_second: f64,
    /// Total lines across all targets in the breakdown
    pub total_lines: u64,
}

/// Compute throughput from a timing breakdown
///
/// Target paths are read as given; relative paths resolve against the
/// current directory.
pub fn compute_throughput(
    timings: &Timings,
    rule_count: usize,
) -> Result<Throughput, ThroughputError> {
    compute_throughput_in(timings, rule_count, None)
}

/// Like [`compute_throughput`], with a fallback root for relative target paths
///
/// A relative path that names no file under the current directory is
/// looked up under `base` instead.
pub fn compute_throughput_in(
    timings: &Timings,
    rule_count: usize,
    base: Option<&Path>,
) -> Result<Throughput, ThroughputError> {
    if !(timings.total_time > 0.0) {
        return Err(ThroughputError::NonPositiveTime(timings.total_time));
    }
    if rule_count == 0 {
        return Err(ThroughputError::NoRules);
    }

    let total_lines: u64 = timings
        .targets
        .par_iter()
        .map(|target| count_lines(&resolve(Path::new(&target.path), base)))
        .sum();

    let denominator = timings.total_time * rule_count as f64;
    Ok(Throughput {
        bytes_per_second: timings.total_bytes as f64 / denominator,
        lines_per_second: total_lines as f64 / denominator,
        total_lines,
    })
}

fn resolve(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() && !path.is_file() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Number of lines in a text file; unreadable or non-UTF-8 files count 0
///
/// `\n`, `\r\n` and a lone `\r` all end a line. A trailing line without a
/// terminator still counts.
pub fn count_lines(path: &Path) -> u64 {
    match std::fs::read_to_string(path) {
        Ok(content) => count_text_lines(&content),
        Err(_) => 0,
    }
}

fn count_text_lines(content: &str) -> u64 {
    let mut lines = 0;
    let mut pending = false;
    let mut bytes = content.bytes().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\n' => {
                lines += 1;
                pending = false;
            }
            b'\r' => {
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
                lines += 1;
                pending = false;
            }
            _ => pending = true,
        }
    }
    lines + u64::from(pending)
}
