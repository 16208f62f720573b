//! Corpus Preparation
//!
//! Turns a [`Corpus`] definition into a [`PreparedCorpus`]: rule configs on
//! local disk and a local target directory.
//!
//! - `rules = { path = ... }` is used as is
//! - `rules = { registry = [...] }` goes through the [`RuleCache`]
//! - `target = { path = ... }` is used as is
//! - `target = { git = ..., commit = ... }` is cloned into
//!   `<cache>/repos/<corpus>` and checked out at the pinned commit

use crate::fetch::{FetchError, RuleCache, RuleFetcher};
use crate::runner::PreparedCorpus;
use rulebench_core::{Corpus, RuleSource, TargetSource};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

/// Why a corpus could not be made available
#[derive(Debug, Error)]
pub enum PrepareError {
    /// A rule config fetch failed for a reason other than a timeout
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A git subcommand exited unsuccessfully
    #[error("git {command} failed: {stderr}")]
    Git {
        /// Subcommand, e.g. `clone`
        command: String,
        /// What git printed on stderr
        stderr: String,
    },

    /// A local rules or target path does not exist
    #[error("Path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    /// Every registry config for the corpus was skipped
    #[error("No rule configs available for corpus '{0}'")]
    NoRules(String),

    /// Running git or touching the cache failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Makes a corpus available locally
pub trait Preparer: Sync {
    /// Resolve local rule files and a local target for `corpus`
    fn prepare(&self, corpus: &Corpus) -> Result<PreparedCorpus, PrepareError>;
}

/// Prepares corpuses using the rule cache and git checkouts under one cache directory
pub struct CorpusPreparer {
    rules: RuleCache,
    fetcher: Box<dyn RuleFetcher>,
    repos_dir: PathBuf,
}

impl CorpusPreparer {
    /// Rule configs go to `<cache_dir>/rules`, checkouts to `<cache_dir>/repos`
    pub fn new(cache_dir: &Path, fetcher: Box<dyn RuleFetcher>) -> Self {
        Self {
            rules: RuleCache::new(cache_dir.join("rules")),
            fetcher,
            repos_dir: cache_dir.join("repos"),
        }
    }

    fn rule_paths(&self, corpus: &Corpus) -> Result<Vec<PathBuf>, PrepareError> {
        match &corpus.rules {
            RuleSource::Path { path } => {
                if !path.exists() {
                    return Err(PrepareError::MissingPath(path.clone()));
                }
                Ok(vec![path.clone()])
            }
            RuleSource::Registry { registry } => {
                let paths = self.rules.populate(registry, self.fetcher.as_ref())?;
                if paths.is_empty() {
                    return Err(PrepareError::NoRules(corpus.name.clone()));
                }
                Ok(paths)
            }
        }
    }

    fn target_path(&self, corpus: &Corpus) -> Result<PathBuf, PrepareError> {
        match &corpus.target {
            TargetSource::Path { path } => {
                if !path.exists() {
                    return Err(PrepareError::MissingPath(path.clone()));
                }
                Ok(path.clone())
            }
            TargetSource::Git { git, commit } => {
                let dest = self.repos_dir.join(&corpus.name);
                materialize(git, commit, &dest)?;
                Ok(dest)
            }
        }
    }
}

impl Preparer for CorpusPreparer {
    fn prepare(&self, corpus: &Corpus) -> Result<PreparedCorpus, PrepareError> {
        debug!(corpus = %corpus.name, "preparing corpus");
        let rules = self.rule_paths(corpus)?;
        let target = self.target_path(corpus)?;
        Ok(PreparedCorpus {
            name: corpus.name.clone(),
            rules,
            target,
        })
    }
}

/// Clone `url` into `dest` if needed and check out `commit`
pub fn materialize(url: &str, commit: &str, dest: &Path) -> Result<(), PrepareError> {
    if !dest.join(".git").exists() {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(%url, dest = %dest.display(), "cloning corpus");
        let dest_str = dest.to_string_lossy();
        git(None, &["clone", "--quiet", url, dest_str.as_ref()])?;
    }

    if git(Some(dest), &["checkout", "--quiet", commit]).is_err() {
        // Shallow or stale clones may not have the commit yet
        debug!(%commit, "commit not present locally, fetching");
        git(Some(dest), &["fetch", "--quiet", "origin", commit])?;
        git(Some(dest), &["checkout", "--quiet", "FETCH_HEAD"])?;
    }
    Ok(())
}

fn git(dir: Option<&Path>, args: &[&str]) -> Result<(), PrepareError> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    let output = command.args(args).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PrepareError::Git {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
