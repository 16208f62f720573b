//! Per-Rule Time Table
//!
//! Folds the per-target timing breakdowns of baseline runs into two views:
//! the total time each rule took on each corpus, and each rule's average
//! time per target across all corpuses. Targets where a rule took no time
//! are left out of the average, so rules that skip most files are not
//! flattered by the zeros.
//!
//! The JSON form maps corpus to rule to seconds, each map keyed in
//! slowest-first order:
//!
//! ```json
//! {
//!   "repository_to_times_per_rule": { "django": { "b": 0.5, "a": 0.3 } },
//!   "time_per_rule_average": { "b": 0.5, "a": 0.15 }
//! }
//! ```

use rulebench_core::Timings;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time attributed to one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTime {
    /// Rule identifier
    pub rule_id: String,
    /// Seconds
    pub seconds: f64,
}

/// Per-rule totals for one corpus, slowest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRuleTimes {
    /// Corpus name
    pub corpus: String,
    /// Rule totals, sorted by descending time
    pub rules: Vec<RuleTime>,
}

/// Snapshot of a [`RuleTimeTable`]; serializes as nested ordered maps
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTimeReport {
    /// Per-corpus totals in the order corpuses were recorded
    pub repository_to_times_per_rule: Vec<CorpusRuleTimes>,
    /// Per-rule average over targets with non-zero time, slowest first
    pub time_per_rule_average: Vec<RuleTime>,
}

impl Serialize for RuleTimeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(
            "repository_to_times_per_rule",
            &ByCorpus(&self.repository_to_times_per_rule),
        )?;
        map.serialize_entry("time_per_rule_average", &ByRule(&self.time_per_rule_average))?;
        map.end()
    }
}

/// `{corpus: {rule_id: seconds}}`, in recording order
struct ByCorpus<'a>(&'a [CorpusRuleTimes]);

impl Serialize for ByCorpus<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for corpus in self.0 {
            map.serialize_entry(&corpus.corpus, &ByRule(&corpus.rules))?;
        }
        map.end()
    }
}

/// `{rule_id: seconds}`, in slice order
struct ByRule<'a>(&'a [RuleTime]);

impl Serialize for ByRule<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in self.0 {
            map.serialize_entry(&rule.rule_id, &rule.seconds)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    total: f64,
    targets: u64,
}

/// Accumulates per-rule timings across corpuses
#[derive(Debug, Clone, Default)]
pub struct RuleTimeTable {
    per_corpus: Vec<CorpusRuleTimes>,
    per_rule: BTreeMap<String, Accumulator>,
}

impl RuleTimeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one corpus's timing breakdown into the table
    ///
    /// Recording the same corpus twice replaces its totals but adds to the
    /// cross-corpus averages again.
    pub fn record(&mut self, corpus: &str, timings: &Timings) {
        let rule_ids: Vec<&str> = timings.rules.iter().map(|r| r.id.as_str()).collect();
        let mut totals = vec![0.0; rule_ids.len()];

        for target in &timings.targets {
            for (idx, &time) in target.parse_times.iter().enumerate().take(rule_ids.len()) {
                totals[idx] += time;
                if time > 0.0 {
                    let acc = self.per_rule.entry(rule_ids[idx].to_string()).or_default();
                    acc.total += time;
                    acc.targets += 1;
                }
            }
        }

        let mut rules: Vec<RuleTime> = rule_ids
            .iter()
            .zip(totals)
            .map(|(id, seconds)| RuleTime {
                rule_id: id.to_string(),
                seconds,
            })
            .collect();
        sort_slowest_first(&mut rules);

        let entry = CorpusRuleTimes {
            corpus: corpus.to_string(),
            rules,
        };
        match self.per_corpus.iter_mut().find(|c| c.corpus == corpus) {
            Some(existing) => *existing = entry,
            None => self.per_corpus.push(entry),
        }
    }

    /// Whether anything has been recorded
    pub fn is_empty(&self) -> bool {
        self.per_corpus.is_empty()
    }

    /// Average time per target for each rule, slowest first
    pub fn averages(&self) -> Vec<RuleTime> {
        let mut averages: Vec<RuleTime> = self
            .per_rule
            .iter()
            .filter(|(_, acc)| acc.targets > 0)
            .map(|(id, acc)| RuleTime {
                rule_id: id.clone(),
                seconds: acc.total / acc.targets as f64,
            })
            .collect();
        sort_slowest_first(&mut averages);
        averages
    }

    /// Build the serializable report
    pub fn report(&self) -> RuleTimeReport {
        RuleTimeReport {
            repository_to_times_per_rule: self.per_corpus.clone(),
            time_per_rule_average: self.averages(),
        }
    }

    /// Render the report as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.report())
    }
}

fn sort_slowest_first(rules: &mut [RuleTime]) {
    rules.sort_by(|a, b| {
        b.seconds
            .partial_cmp(&a.seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulebench_core::{RuleTiming, TargetTiming};

    fn timings(rules: &[&str], targets: &[&[f64]]) -> Timings {
        Timings {
            rules: rules
                .iter()
                .map(|id| RuleTiming {
                    id: id.to_string(),
                    other: BTreeMap::new(),
                })
                .collect(),
            total_time: 1.0,
            total_bytes: 0,
            targets: targets
                .iter()
                .enumerate()
                .map(|(i, times)| TargetTiming {
                    path: format!("f{i}.py"),
                    parse_times: times.to_vec(),
                    match_times: Vec::new(),
                    run_time: None,
                    other: BTreeMap::new(),
                })
                .collect(),
            other: BTreeMap::new(),
        }
    }

    #[test]
    fn sums_per_corpus_and_sorts_descending() {
        let mut table = RuleTimeTable::new();
        table.record("django", &timings(&["a", "b"], &[&[0.1, 0.5], &[0.2, 0.0]]));

        let report = table.report();
        let django = &report.repository_to_times_per_rule[0];
        assert_eq!(django.corpus, "django");
        assert_eq!(django.rules[0].rule_id, "b");
        assert!((django.rules[0].seconds - 0.5).abs() < 1e-9);
        assert_eq!(django.rules[1].rule_id, "a");
        assert!((django.rules[1].seconds - 0.3).abs() < 1e-9);
    }

    #[test]
    fn averages_skip_zero_times_and_span_corpuses() {
        let mut table = RuleTimeTable::new();
        table.record("one", &timings(&["a", "b"], &[&[0.2, 0.0], &[0.4, 0.0]]));
        table.record("two", &timings(&["a"], &[&[0.6]]));

        let averages = table.averages();
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].rule_id, "a");
        assert!((averages[0].seconds - 0.4).abs() < 1e-9);
    }

    #[test]
    fn targets_without_parse_times_contribute_nothing() {
        let mut table = RuleTimeTable::new();
        table.record("bare", &timings(&["a"], &[&[]]));
        assert!(table.averages().is_empty());
        assert_eq!(table.report().repository_to_times_per_rule[0].rules[0].seconds, 0.0);
    }

    #[test]
    fn json_has_both_sections() {
        let mut table = RuleTimeTable::new();
        assert!(table.is_empty());
        table.record("c", &timings(&["a"], &[&[1.0]]));
        let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(json["repository_to_times_per_rule"]["c"]["a"], 1.0);
        assert_eq!(json["time_per_rule_average"]["a"], 1.0);
    }

    #[test]
    fn json_maps_keep_slowest_first_order() {
        let mut table = RuleTimeTable::new();
        table.record("django", &timings(&["a", "b"], &[&[0.1, 0.5], &[0.2, 0.0]]));
        table.record("flask", &timings(&["z"], &[&[0.1]]));

        let json = table.to_json().unwrap();
        let django = json.find("\"django\"").unwrap();
        let flask = json.find("\"flask\"").unwrap();
        assert!(django < flask);

        // "b" sorts after "a" alphabetically but is slower, so it comes first
        let times = &json[django..flask];
        assert!(times.find("\"b\"").unwrap() < times.find("\"a\"").unwrap());

        let averages = &json[json.find("time_per_rule_average").unwrap()..];
        assert!(averages.find("\"b\"").unwrap() < averages.find("\"a\"").unwrap());
    }
}
