#![warn(missing_docs)]
//! RuleBench Core - Findings and Baseline Comparison
//!
//! This crate holds the data model shared by the harness and the logic that
//! decides whether a variant changed behavior:
//! - `Corpus` and `Variant` definitions, with the built-in variant catalog
//! - Parsing of the analysis tool's JSON output into a `RunResult`
//! - Finding normalization with a canonical, key-sorted form
//! - Diffing against the baseline and the OK/WARNING/ERROR policy

mod corpus;
mod diff;
mod error;
mod finding;
mod result;
mod variant;

pub use corpus::{Corpus, RuleSource, TargetSource};
pub use diff::{BaselineCheck, FindingDiff, Verdict, check_against_baseline, diff};
pub use error::{CoreError, MAX_PAYLOAD_EXCERPT};
pub use finding::{NormalizeOptions, NormalizedFinding, canonical_json, mask_finding};
pub use result::{FindingSet, RuleTiming, RunResult, TargetTiming, Timings, normalize};
pub use variant::{BASELINE_VARIANT, Variant, VariantCatalog};
