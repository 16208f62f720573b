//! Run Planner
//!
//! Builds the execution plan by selecting corpuses and variants.
//!
//! Selection options:
//! - Regex pattern matching on corpus name
//! - Explicit variant names (the baseline is always kept)
//!
//! Ordering: corpuses keep their configuration order; variants keep catalog order.

use regex::Regex;
use rulebench_core::{Corpus, VariantCatalog};

/// Execution plan for one invocation
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Corpuses to run, in configuration order
    pub corpora: Vec<Corpus>,
    /// Variants to run against every corpus
    pub catalog: VariantCatalog,
    /// Requested variant names that are not in the catalog
    pub unknown_variants: Vec<String>,
}

impl ExecutionPlan {
    /// Number of (corpus, variant) pairs
    pub fn pair_count(&self) -> usize {
        self.corpora.len() * self.catalog.len()
    }
}

/// Build execution plan from configured corpuses and the variant catalog
pub fn build_plan(
    corpora: &[Corpus],
    catalog: &VariantCatalog,
    filter: Option<&Regex>,
    variants: &[String],
) -> ExecutionPlan {
    let corpora = corpora
        .iter()
        .filter(|c| filter.is_none_or(|re| re.is_match(&c.name)))
        .cloned()
        .collect();

    let (catalog, unknown_variants) = if variants.is_empty() {
        (catalog.clone(), Vec::new())
    } else {
        let unknown = variants
            .iter()
            .filter(|name| !catalog.variants().iter().any(|v| &v.name == *name))
            .cloned()
            .collect();
        (catalog.retain_named(variants), unknown)
    };

    ExecutionPlan {
        corpora,
        catalog,
        unknown_variants,
    }
}
