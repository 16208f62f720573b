//! System Metadata Collection
//!
//! Collects the context a report was produced in: harness version, git
//! commit of the working directory, the tool command line, OS and core
//! count.

use chrono::Utc;
use rulebench_report::ReportMeta;

/// Build report metadata for a run of `tool`
pub fn build_report_meta(tool: &[String]) -> ReportMeta {
    let git_commit = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    ReportMeta {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit,
        tool: tool.to_vec(),
        os: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        cpu_cores: num_cpus(),
    }
}

/// Get number of available CPU cores
fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}
