//! Benchmark Executor
//!
//! Drives the (corpus × variant) matrix and collects the outcomes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Corpus (from rulebench.toml)
//!       │
//!       ▼
//! ┌─────────────┐
//! │   prepare   │  Fetch rule configs, check out targets
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   matrix    │  Run variants (baseline first), normalize, compare
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  aggregate  │  Status lines, durations, rule times, report
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`matrix`] - Per-corpus execution and outcome construction
//! - [`metadata`] - System metadata collection

mod matrix;
mod metadata;

// Re-export public API
pub use matrix::{CorpusRun, Matrix, MatrixConfig};
pub use metadata::build_report_meta;
