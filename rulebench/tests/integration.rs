//! Integration tests for RuleBench
//!
//! These tests drive the whole matrix end to end: a shell script stands in
//! for the analysis tool and answers according to the engine options it
//! receives through its environment.

#![cfg(unix)]

use rulebench::{
    Aggregator, Corpus, CorpusPreparer, Matrix, MatrixConfig, OutcomeStatus, OutputFormat,
    ProcessRunner, Report, RuleTimeTable, RunnerSettings, Variant, VariantCatalog, render,
};
use rulebench_cli::{CorpusRun, HttpRuleFetcher, build_report_meta};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FAKE_TOOL: &str = r#"#!/bin/sh
for last; do :; done
F1='{"check_id":"f1","path":"a.py","start":{"line":1},"extra":{"message":"one","lines":"x = 1","metavars":{}}}'
F1B='{"check_id":"f1","path":"a.py","start":{"line":1},"extra":{"message":"reworded","lines":"x  =  1","metavars":{}}}'
F2='{"check_id":"f2","path":"a.py","start":{"line":2},"extra":{"message":"two","lines":"y = 2","metavars":{}}}'
F3='{"check_id":"f3","path":"b.py","start":{"line":3},"extra":{"message":"three","lines":"z = 3","metavars":{}}}'
TIME="{\"rules\":[{\"id\":\"r1\"},{\"id\":\"r2\"}],\"total_time\":2.0,\"total_bytes\":1000,\"targets\":[{\"path\":\"$last\",\"parse_times\":[0.5,0.25],\"match_times\":[0.1,0.1],\"run_time\":1.0}]}"
case "$SEMGREP_CORE_EXTRA" in
  -alt) echo "{\"results\":[$F1B,$F3],\"errors\":[],\"time\":$TIME}" ;;
  -same) echo "{\"results\":[$F2,$F1B],\"errors\":[],\"time\":$TIME}" ;;
  -noisy) echo "{\"results\":[$F2,$F1],\"errors\":[{\"message\":\"e\"}],\"time\":$TIME}" ;;
  -garbled) echo "this is not json"; echo "engine crashed" >&2 ;;
  -partial) echo "{\"results\":[$F1,$F2],\"errors\":[],\"time\":$TIME}"; exit 3 ;;
  -crash) echo "segmentation fault" >&2; exit 139 ;;
  -hang) exec sleep 30 ;;
  *) echo "{\"results\":[$F1,$F2],\"errors\":[],\"time\":$TIME}" ;;
esac
"#;

struct Fixture {
    dir: tempfile::TempDir,
    tool: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-semgrep");
        std::fs::write(&tool, FAKE_TOOL).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, tool }
    }

    /// Local corpus with a 5-line target file
    fn corpus(&self, name: &str) -> Corpus {
        let root = self.dir.path().join(name);
        std::fs::create_dir_all(&root).unwrap();
        let rules = root.join("rules.yaml");
        let target = root.join("target.py");
        std::fs::write(&rules, "rules: []\n").unwrap();
        std::fs::write(&target, "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n").unwrap();
        Corpus::local(name, rules, target)
    }

    fn runner(&self, timeout: Option<Duration>) -> ProcessRunner {
        ProcessRunner::new(RunnerSettings {
            tool: vec![self.tool.to_string_lossy().into_owned()],
            timeout,
            ..Default::default()
        })
    }

    fn preparer(&self) -> CorpusPreparer {
        // Local corpuses never reach the fetcher
        let fetcher = HttpRuleFetcher::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        CorpusPreparer::new(&self.dir.path().join("cache"), Box::new(fetcher))
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn catalog(variants: &[(&str, &str)]) -> VariantCatalog {
    VariantCatalog::new(
        variants
            .iter()
            .map(|(name, engine)| Variant::new(*name, *engine, ""))
            .collect(),
    )
    .unwrap()
}

fn statuses(run: &CorpusRun) -> Vec<(&str, OutcomeStatus)> {
    run.outcomes
        .iter()
        .map(|o| (o.variant.as_str(), o.status))
        .collect()
}

fn report(runs: &[CorpusRun]) -> Report {
    let mut aggregator = Aggregator::new();
    for run in runs {
        aggregator.extend(run.outcomes.iter().cloned());
    }
    aggregator.into_report(build_report_meta(&["fake-semgrep".to_string()]))
}

/// Behavior regression, error drift and pair-scoped failures in one matrix
#[test]
fn test_full_matrix() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[
        ("std", ""),
        ("alt", "-alt"),
        ("same", "-same"),
        ("noisy", "-noisy"),
        ("garbled", "-garbled"),
        ("crash", "-crash"),
    ]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let corpora = vec![fixture.corpus("first"), fixture.corpus("second")];
    let runs = matrix.run(&corpora).unwrap();
    assert_eq!(runs.len(), 2);

    let expected = vec![
        ("std", OutcomeStatus::Ok),
        ("alt", OutcomeStatus::Error),
        ("same", OutcomeStatus::Ok),
        ("noisy", OutcomeStatus::Warning),
        ("garbled", OutcomeStatus::Fatal),
        ("crash", OutcomeStatus::Fatal),
    ];
    // Failures in the first corpus do not stop the second
    assert_eq!(statuses(&runs[0]), expected);
    assert_eq!(statuses(&runs[1]), expected);

    // {f1, f2} baseline vs {f1, f3}: f3 extra, f2 missing
    let alt = &runs[0].outcomes[1];
    let diff = alt.diff.as_ref().unwrap();
    assert_eq!(diff.extra.len(), 1);
    assert_eq!(diff.extra[0]["check_id"], "f3");
    assert_eq!(diff.missing.len(), 1);
    assert_eq!(diff.missing[0]["check_id"], "f2");
    assert!(alt.message.contains("1 extra, 1 missing"));

    // Malformed output keeps its duration; a crash reports its exit code
    assert!(runs[0].outcomes[4].duration_s.is_some());
    assert!(runs[0].outcomes[5].message.contains("139"));

    let report = report(&runs);
    assert_eq!(report.summary.total, 12);
    assert_eq!(report.summary.ok, 4);
    assert_eq!(report.summary.errors, 2);
    assert_eq!(report.summary.warnings, 2);
    assert_eq!(report.summary.fatal, 4);
    assert!(report.summary.has_fatal());
    assert!(report.summary.has_regressions());
}

/// Baseline throughput: 1000 bytes over 2.0 s and 2 rules
#[test]
fn test_baseline_throughput_and_rule_times() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", ""), ("alt", "-same")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let runs = matrix.run(&[fixture.corpus("flask")]).unwrap();
    let baseline = &runs[0].outcomes[0];
    assert!(baseline.baseline);

    let throughput = baseline.throughput.unwrap();
    assert_eq!(throughput.bytes_per_second, 250.0);
    assert_eq!(throughput.total_lines, 5);
    assert_eq!(throughput.lines_per_second, 1.25);
    // Only the baseline carries metrics
    assert!(runs[0].outcomes[1].throughput.is_none());

    let mut table = RuleTimeTable::new();
    table.record(&runs[0].corpus, runs[0].baseline_timings.as_ref().unwrap());
    let rule_times = table.report();
    let flask = &rule_times.repository_to_times_per_rule[0];
    assert_eq!(flask.corpus, "flask");
    assert_eq!(flask.rules[0].rule_id, "r1");
    assert_eq!(flask.rules[0].seconds, 0.5);
    assert_eq!(flask.rules[1].seconds, 0.25);
}

/// The partial-parse exit code is a usable run, flagged as a warning
#[test]
fn test_partial_parse_exit_code() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", "-partial"), ("alt", "")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let runs = matrix.run(&[fixture.corpus("django")]).unwrap();
    assert_eq!(
        statuses(&runs[0]),
        vec![("std", OutcomeStatus::Warning), ("alt", OutcomeStatus::Ok)]
    );
    assert!(runs[0].outcomes[0].message.contains("exit code 3"));
    assert_eq!(runs[0].outcomes[0].findings, Some(2));
}

/// A failed baseline leaves the other variants timed but uncompared
#[test]
fn test_failed_baseline() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", "-crash"), ("alt", "-alt")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let runs = matrix.run(&[fixture.corpus("lodash")]).unwrap();
    assert_eq!(
        statuses(&runs[0]),
        vec![
            ("std", OutcomeStatus::Fatal),
            ("alt", OutcomeStatus::BaselineUnavailable)
        ]
    );
    assert!(runs[0].outcomes[1].duration_s.is_some());
    assert!(runs[0].outcomes[1].diff.is_none());
}

/// Timeouts terminate the tool and become FATAL for the pair only
#[test]
fn test_timeout_is_fatal_for_pair() {
    let fixture = Fixture::new();
    let runner = fixture.runner(Some(Duration::from_millis(300)));
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", ""), ("slow", "-hang"), ("alt", "-same")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let runs = matrix.run(&[fixture.corpus("rails")]).unwrap();
    assert_eq!(
        statuses(&runs[0]),
        vec![
            ("std", OutcomeStatus::Ok),
            ("slow", OutcomeStatus::Fatal),
            ("alt", OutcomeStatus::Ok)
        ]
    );
    assert!(runs[0].outcomes[1].message.contains("timed out"));
}

/// Parallel corpuses see only their own engine options and keep their order
#[test]
fn test_parallel_matches_sequential() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", ""), ("alt", "-alt"), ("same", "-same")]);
    let corpora: Vec<Corpus> = (0..4).map(|i| fixture.corpus(&format!("c{i}"))).collect();

    let sequential = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default())
        .run(&corpora)
        .unwrap();
    let parallel = Matrix::new(
        &runner,
        &preparer,
        &catalog,
        MatrixConfig {
            jobs: 4,
            ..Default::default()
        },
    )
    .run(&corpora)
    .unwrap();

    let summary = |runs: &[CorpusRun]| -> Vec<String> {
        runs.iter()
            .flat_map(|r| r.outcomes.iter())
            .map(|o| format!("{}/{} {:?}", o.corpus, o.variant, o.status))
            .collect()
    };
    assert_eq!(summary(&sequential), summary(&parallel));
    assert_eq!(summary(&parallel)[1], "c0/alt Error");
}

/// Missing corpus files fail preparation for every pair of that corpus
#[test]
fn test_preparation_failure() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("std", ""), ("alt", "-same")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let missing = Corpus::local(
        "missing",
        fixture.root().join("nope.yaml"),
        fixture.root().join("nope"),
    );
    let runs = matrix.run(&[missing, fixture.corpus("present")]).unwrap();
    assert!(runs[0].outcomes.iter().all(|o| o.status == OutcomeStatus::Fatal));
    assert!(runs[1].outcomes.iter().all(|o| o.status == OutcomeStatus::Ok));
}

/// Status lines come out in traversal order
#[test]
fn test_summary_output() {
    let fixture = Fixture::new();
    let runner = fixture.runner(None);
    let preparer = fixture.preparer();
    let catalog = catalog(&[("alt", "-alt"), ("std", "")]);
    let matrix = Matrix::new(&runner, &preparer, &catalog, MatrixConfig::default());

    let runs = matrix.run(&[fixture.corpus("demo")]).unwrap();
    let report = report(&runs);
    let text = render(&report, OutputFormat::Summary).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("OK      demo/std:"));
    assert!(lines[0].contains("[2 findings, 0 errors]"));
    assert!(lines[1].starts_with("ERROR   demo/alt:"));

    let json = render(&report, OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["outcomes"][1]["status"], "error");
    assert_eq!(parsed["summary"]["errors"], 1);
}
