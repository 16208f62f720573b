//! Execution Matrix
//!
//! Runs every variant against every corpus and turns each run into a
//! [`BenchmarkOutcome`].
//!
//! ## Per-corpus flow
//!
//! ```text
//!   Corpus
//!     │ prepare (fetch rules, checkout target)
//!     ▼
//!   baseline ("std") ──► RunResult ──► throughput
//!     │
//!     ▼
//!   variant 1..n ──► RunResult ──► check against baseline ──► OK / WARNING / ERROR
//! ```
//!
//! Failures are scoped to the pair: a crashed, timed-out or garbled run
//! becomes a FATAL outcome and the matrix moves on. A corpus that cannot be
//! prepared yields FATAL for all of its pairs. Without a baseline result the
//! remaining variants still run and are timed, but are not compared.
//!
//! Corpuses are independent and may run in parallel; variants of one corpus
//! always run in order, baseline first. Output order never depends on
//! scheduling.

use crate::prepare::Preparer;
use crate::runner::{PreparedCorpus, RawRun, RunError, Runner};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use rulebench_core::{
    Corpus, NormalizeOptions, RunResult, Timings, Variant, VariantCatalog,
    check_against_baseline, normalize,
};
use rulebench_report::BenchmarkOutcome;
use rulebench_stats::compute_throughput_in;
use std::path::Path;
use tracing::{debug, error, warn};

/// Configuration for matrix execution
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// How findings are normalized before comparison
    pub normalize: NormalizeOptions,
    /// Number of corpuses run in parallel
    pub jobs: usize,
    /// Draw a progress bar on the terminal
    pub show_progress: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            jobs: 1,
            show_progress: false,
        }
    }
}

/// Outcomes of one corpus, in execution order
#[derive(Debug, Clone)]
pub struct CorpusRun {
    /// Corpus name
    pub corpus: String,
    /// One outcome per variant, baseline first
    pub outcomes: Vec<BenchmarkOutcome>,
    /// Timing breakdown of the baseline run, when it produced one
    pub baseline_timings: Option<Timings>,
}

/// A successful pair: raw invocation plus its normalized result
struct PairRun {
    raw: RawRun,
    result: RunResult,
}

/// A failed pair
struct PairFailure {
    duration_s: Option<f64>,
    message: String,
}

/// Runs the (corpus × variant) matrix
pub struct Matrix<'a> {
    runner: &'a dyn Runner,
    preparer: &'a dyn Preparer,
    catalog: &'a VariantCatalog,
    config: MatrixConfig,
}

impl<'a> Matrix<'a> {
    /// Create a matrix over `catalog`, running pairs with `runner`
    pub fn new(
        runner: &'a dyn Runner,
        preparer: &'a dyn Preparer,
        catalog: &'a VariantCatalog,
        config: MatrixConfig,
    ) -> Self {
        Self {
            runner,
            preparer,
            catalog,
            config,
        }
    }

    /// Run all corpuses; results come back in the order of `corpora`
    pub fn run(&self, corpora: &[Corpus]) -> anyhow::Result<Vec<CorpusRun>> {
        let pb = self.progress_bar((corpora.len() * self.catalog.len()) as u64);

        let runs: Vec<CorpusRun> = if self.config.jobs <= 1 || corpora.len() <= 1 {
            corpora
                .iter()
                .map(|corpus| self.run_corpus(corpus, &pb))
                .collect()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.config.jobs.min(corpora.len()))
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build worker pool: {}", e))?;

            // Indexed collect keeps corpus order regardless of completion order
            pool.install(|| {
                corpora
                    .par_iter()
                    .map(|corpus| self.run_corpus(corpus, &pb))
                    .collect()
            })
        };

        pb.finish_with_message("Complete");
        Ok(runs)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Prepare one corpus and run its variants, baseline first
    pub fn run_corpus(&self, corpus: &Corpus, pb: &ProgressBar) -> CorpusRun {
        let variants = self.catalog.execution_order();
        let mut run = CorpusRun {
            corpus: corpus.name.clone(),
            outcomes: Vec::with_capacity(variants.len()),
            baseline_timings: None,
        };

        pb.set_message(format!("{} (preparing)", corpus.name));
        let prepared = match self.preparer.prepare(corpus) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(corpus = %corpus.name, error = %e, "corpus preparation failed");
                let message = format!("preparation failed: {e}");
                for variant in variants {
                    run.outcomes.push(BenchmarkOutcome::fatal(
                        &corpus.name,
                        &variant.name,
                        variant.is_baseline(),
                        None,
                        message.clone(),
                    ));
                    pb.inc(1);
                }
                return run;
            }
        };

        let mut baseline: Option<RunResult> = None;
        for variant in variants {
            pb.set_message(format!("{}/{}", corpus.name, variant.name));
            let outcome = match self.run_pair(&prepared, variant, pb) {
                Ok(pair) => {
                    let duration_s = pair.raw.duration.as_secs_f64();
                    let partial = pair.raw.partial_parse.then_some(pair.raw.exit_code);

                    if variant.is_baseline() {
                        let throughput = pair.result.timings().and_then(|timings| {
                            match compute_throughput_in(
                                timings,
                                timings.rule_count(),
                                Some(target_root(&prepared.target)),
                            ) {
                                Ok(throughput) => Some(throughput),
                                Err(e) => {
                                    warn!(corpus = %corpus.name, error = %e, "no throughput for baseline");
                                    None
                                }
                            }
                        });
                        let outcome = BenchmarkOutcome::baseline(
                            &corpus.name,
                            &variant.name,
                            duration_s,
                            &pair.result,
                            throughput,
                            partial,
                        );
                        run.baseline_timings = pair.result.timings().cloned();
                        baseline = Some(pair.result);
                        outcome
                    } else if let Some(baseline) = &baseline {
                        let check = check_against_baseline(&pair.result, baseline);
                        BenchmarkOutcome::checked(
                            &corpus.name,
                            &variant.name,
                            duration_s,
                            &pair.result,
                            &check,
                            partial,
                        )
                    } else {
                        BenchmarkOutcome::baseline_unavailable(
                            &corpus.name,
                            &variant.name,
                            Some(duration_s),
                            Some(&pair.result),
                        )
                    }
                }
                Err(failure) => BenchmarkOutcome::fatal(
                    &corpus.name,
                    &variant.name,
                    variant.is_baseline(),
                    failure.duration_s,
                    failure.message,
                ),
            };

            debug!(line = %outcome.line(), "pair finished");
            run.outcomes.push(outcome);
            pb.inc(1);
        }
        run
    }

    fn run_pair(
        &self,
        corpus: &PreparedCorpus,
        variant: &Variant,
        pb: &ProgressBar,
    ) -> Result<PairRun, PairFailure> {
        let raw = match self.runner.execute(corpus, variant) {
            Ok(raw) => raw,
            Err(e) => {
                error!(corpus = %corpus.name, variant = %variant.name, error = %e, "run failed");
                let duration_s = match &e {
                    RunError::ToolFailed { stdout, stderr, .. } => {
                        pb.suspend(|| surface_output(corpus, variant, stdout, stderr));
                        None
                    }
                    RunError::Timeout {
                        elapsed,
                        stdout,
                        stderr,
                    } => {
                        pb.suspend(|| surface_output(corpus, variant, stdout, stderr));
                        Some(elapsed.as_secs_f64())
                    }
                    _ => None,
                };
                return Err(PairFailure {
                    duration_s,
                    message: e.to_string(),
                });
            }
        };

        match normalize(
            &raw.stdout,
            self.runner.requests_timings(),
            self.config.normalize,
        ) {
            Ok(result) => Ok(PairRun { raw, result }),
            Err(e) => {
                let e = RunError::from(e);
                error!(corpus = %corpus.name, variant = %variant.name, error = %e, "unusable tool output");
                let stderr = String::from_utf8_lossy(&raw.stderr);
                pb.suspend(|| surface_output(corpus, variant, "", &stderr));
                Err(PairFailure {
                    duration_s: Some(raw.duration.as_secs_f64()),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Root that relative target paths in a timing breakdown resolve against
fn target_root(target: &Path) -> &Path {
    if target.is_dir() {
        target
    } else {
        target.parent().unwrap_or(target)
    }
}

/// Print captured tool output for a failed pair
fn surface_output(corpus: &PreparedCorpus, variant: &Variant, stdout: &str, stderr: &str) {
    eprintln!("--- {}/{} failed ---", corpus.name, variant.name);
    if !stdout.trim().is_empty() {
        eprintln!("stdout:\n{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        eprintln!("stderr:\n{}", stderr.trim_end());
    }
}
