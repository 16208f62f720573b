//! Corpus Definitions
//!
//! A corpus pairs a rule set with a target codebase. Both sides either point
//! at something already on disk or describe how to obtain it; obtaining them
//! is the preparation step that runs before any variant executes.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a corpus's rules come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSource {
    /// A rule file or directory already on disk
    Path {
        /// Location of the rules
        path: PathBuf,
    },
    /// Rule configs fetched from the registry by identifier (e.g. `p/python`)
    Registry {
        /// Registry identifiers, fetched into the rule cache
        registry: Vec<String>,
    },
}

/// Where a corpus's target code comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSource {
    /// A directory already on disk
    Path {
        /// Location of the target code
        path: PathBuf,
    },
    /// A git repository checked out at a fixed commit
    Git {
        /// Clone URL
        git: String,
        /// Commit hash (or any ref `git checkout` accepts)
        commit: String,
    },
}

/// One benchmark unit: a rule set run against a target codebase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    /// Unique corpus name
    pub name: String,
    /// Rule set location
    pub rules: RuleSource,
    /// Target code location
    pub target: TargetSource,
}

impl Corpus {
    /// Corpus with rules and target both already on disk
    pub fn local(
        name: impl Into<String>,
        rules: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            rules: RuleSource::Path { path: rules.into() },
            target: TargetSource::Path {
                path: target.into(),
            },
        }
    }

    /// Whether anything must be fetched or checked out before running
    pub fn needs_preparation(&self) -> bool {
        matches!(self.rules, RuleSource::Registry { .. })
            || matches!(self.target, TargetSource::Git { .. })
    }

    /// Reject definitions that cannot be prepared or reported on
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: &str| CoreError::InvalidCorpus {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        // Names become directory and metric path components
        if self.name.contains(['/', '\\']) || self.name.chars().any(char::is_whitespace) {
            return Err(invalid("name must not contain path separators or whitespace"));
        }
        if let RuleSource::Registry { registry } = &self.rules {
            if registry.is_empty() {
                return Err(invalid("registry rule list is empty"));
            }
        }
        if let TargetSource::Git { git, commit } = &self.target {
            if git.trim().is_empty() || commit.trim().is_empty() {
                return Err(invalid("git target needs both a url and a commit"));
            }
        }
        Ok(())
    }
}
