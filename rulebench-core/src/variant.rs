//! Variant Catalog
//!
//! A variant is a named set of extra options for one invocation of the
//! analysis tool. Exactly one variant, [`BASELINE_VARIANT`], is the
//! reference every other variant is checked against.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the baseline variant
pub const BASELINE_VARIANT: &str = "std";

/// Named option set passed to the analysis tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique variant name
    pub name: String,
    /// Extra options for the inner analysis engine (opaque)
    #[serde(default)]
    pub engine_opts: String,
    /// Extra arguments for the outer tool, whitespace separated
    #[serde(default)]
    pub tool_opts: String,
}

impl Variant {
    /// Create a variant
    pub fn new(
        name: impl Into<String>,
        engine_opts: impl Into<String>,
        tool_opts: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            engine_opts: engine_opts.into(),
            tool_opts: tool_opts.into(),
        }
    }

    /// Whether this is the baseline variant
    pub fn is_baseline(&self) -> bool {
        self.name == BASELINE_VARIANT
    }

    /// Outer tool arguments split into words
    pub fn tool_args(&self) -> Vec<String> {
        self.tool_opts
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Ordered, validated list of variants containing the baseline exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCatalog {
    variants: Vec<Variant>,
}

impl VariantCatalog {
    /// Build a catalog, rejecting duplicate names and a missing baseline
    pub fn new(variants: Vec<Variant>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for variant in &variants {
            if !seen.insert(variant.name.as_str()) {
                return Err(CoreError::DuplicateVariant(variant.name.clone()));
            }
        }
        if !seen.contains(BASELINE_VARIANT) {
            return Err(CoreError::MissingBaseline(BASELINE_VARIANT.to_string()));
        }
        Ok(Self { variants })
    }

    /// The built-in catalog of engine optimizations
    pub fn builtin() -> Self {
        Self {
            variants: vec![
                Variant::new(BASELINE_VARIANT, "", ""),
                Variant::new("no-cache", "-no_opt_cache", ""),
                Variant::new("max-cache", "-opt_max_cache", ""),
                Variant::new("no-bloom", "-no_bloom_filter", ""),
                Variant::new("no-gc-tuning", "-no_gc_tuning", ""),
                Variant::new("set-filters", "-set_filter", ""),
                Variant::new("experimental", "", "--optimizations all"),
            ],
        }
    }

    /// Variants in declared order
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The baseline variant
    pub fn baseline(&self) -> &Variant {
        self.variants
            .iter()
            .find(|v| v.is_baseline())
            .unwrap_or_else(|| unreachable!("catalog is validated to contain the baseline"))
    }

    /// Execution order: the baseline first, then the rest in declared order
    pub fn execution_order(&self) -> Vec<&Variant> {
        let mut order = Vec::with_capacity(self.variants.len());
        order.push(self.baseline());
        order.extend(self.variants.iter().filter(|v| !v.is_baseline()));
        order
    }

    /// Keep only the named variants (the baseline is always kept)
    pub fn retain_named(&self, names: &[String]) -> Self {
        Self {
            variants: self
                .variants
                .iter()
                .filter(|v| v.is_baseline() || names.iter().any(|n| n == &v.name))
                .cloned()
                .collect(),
        }
    }

    /// Number of variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Always false: a valid catalog holds at least the baseline
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Default for VariantCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = VariantCatalog::builtin();
        assert!(VariantCatalog::new(catalog.variants().to_vec()).is_ok());
        assert_eq!(catalog.baseline().name, "std");
        assert_eq!(catalog.variants()[0].name, "std");
    }

    #[test]
    fn rejects_missing_baseline() {
        let err = VariantCatalog::new(vec![Variant::new("alt", "-x", "")]).unwrap_err();
        assert!(matches!(err, CoreError::MissingBaseline(_)));
    }

    #[test]
    fn rejects_duplicates() {
        let err = VariantCatalog::new(vec![
            Variant::new("std", "", ""),
            Variant::new("alt", "-x", ""),
            Variant::new("alt", "-y", ""),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateVariant(name) if name == "alt"));
    }

    #[test]
    fn baseline_runs_first_even_if_declared_later() {
        let catalog = VariantCatalog::new(vec![
            Variant::new("a", "", ""),
            Variant::new("std", "", ""),
            Variant::new("b", "", ""),
        ])
        .unwrap();
        let order: Vec<_> = catalog
            .execution_order()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(order, vec!["std", "a", "b"]);
    }

    #[test]
    fn retain_keeps_baseline() {
        let catalog = VariantCatalog::builtin().retain_named(&["no-bloom".to_string()]);
        let names: Vec<_> = catalog.variants().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["std", "no-bloom"]);
    }

    #[test]
    fn tool_args_split_on_whitespace() {
        let v = Variant::new("experimental", "", "  --optimizations   all ");
        assert_eq!(v.tool_args(), vec!["--optimizations", "all"]);
    }
}
