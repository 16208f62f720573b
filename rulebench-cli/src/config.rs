//! Configuration loading from rulebench.toml
//!
//! RuleBench configuration lives in a `rulebench.toml` file in the project
//! root. The configuration is discovered by walking up from the current
//! directory; CLI flags override it.

use rulebench_core::{Corpus, Variant, VariantCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up by [`BenchConfig::discover`]
pub const CONFIG_FILE: &str = "rulebench.toml";

/// RuleBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    /// Tool invocation settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Rule cache and corpus checkout settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Dashboard upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// CI/CD configuration
    #[serde(default)]
    pub ci: CiConfig,
    /// Corpuses, in run order
    #[serde(default, rename = "corpus")]
    pub corpora: Vec<Corpus>,
    /// Variant catalog; the built-in catalog is used when empty
    #[serde(default, rename = "variant")]
    pub variants: Vec<Variant>,
}

/// Settings for invoking the analysis tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Executable followed by fixed leading arguments
    #[serde(default = "default_tool")]
    pub tool: Vec<String>,
    /// Environment variable carrying a variant's engine options
    #[serde(default = "default_engine_env")]
    pub engine_env: String,
    /// Per-invocation timeout (e.g., "30m"); "none" or "0" disables it
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Exit code the tool uses for "some files failed to parse"
    #[serde(default = "default_partial_exit_code")]
    pub partial_exit_code: i32,
    /// Request the timing breakdown from the tool
    #[serde(default = "default_time")]
    pub time: bool,
    /// Number of corpuses run in parallel
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            engine_env: default_engine_env(),
            timeout: default_timeout(),
            partial_exit_code: default_partial_exit_code(),
            time: default_time(),
            jobs: None,
        }
    }
}

fn default_tool() -> Vec<String> {
    vec!["semgrep".to_string()]
}
fn default_engine_env() -> String {
    "SEMGREP_CORE_EXTRA".to_string()
}
fn default_timeout() -> String {
    "none".to_string()
}
fn default_partial_exit_code() -> i32 {
    3
}
fn default_time() -> bool {
    true
}

/// Rule cache and corpus checkout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding fetched rule configs and checked-out corpuses
    #[serde(default = "default_cache_dir")]
    pub directory: String,
    /// Base URL rule-config identifiers are resolved against
    #[serde(default = "default_rules_url")]
    pub rules_url: String,
    /// Timeout for fetching one rule config
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            rules_url: default_rules_url(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

fn default_cache_dir() -> String {
    "target/rulebench/cache".to_string()
}
fn default_rules_url() -> String {
    "https://semgrep.dev/c".to_string()
}
fn default_fetch_timeout() -> String {
    "30s".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "summary" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Write one duration per line to this file
    #[serde(default)]
    pub summary_file: Option<String>,
    /// Write the JSON report to this file
    #[serde(default)]
    pub report: Option<String>,
    /// Write the per-rule time table to this file
    #[serde(default)]
    pub rule_times: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            summary_file: None,
            report: None,
            rule_times: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

/// Dashboard upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Dashboard base URL; uploads are disabled when unset
    #[serde(default)]
    pub dashboard: Option<String>,
    /// Timeout for one upload request
    #[serde(default = "default_upload_timeout")]
    pub timeout: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dashboard: None,
            timeout: default_upload_timeout(),
        }
    }
}

fn default_upload_timeout() -> String {
    "10s".to_string()
}

/// CI/CD configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CiConfig {
    /// Exit non-zero when any variant's findings differ from the baseline
    #[serde(default)]
    pub fail_on_regression: bool,
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    ///
    /// Returns the config together with the directory it was found in.
    pub fn discover() -> Option<anyhow::Result<(Self, PathBuf)>> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(Self::load(&config_path).map(|config| (config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// The variant catalog: configured variants, or the built-in catalog
    pub fn catalog(&self) -> anyhow::Result<VariantCatalog> {
        if self.variants.is_empty() {
            Ok(VariantCatalog::builtin())
        } else {
            Ok(VariantCatalog::new(self.variants.clone())?)
        }
    }

    /// Check every corpus definition and reject duplicate names
    pub fn validate_corpora(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for corpus in &self.corpora {
            corpus.validate()?;
            if !seen.insert(corpus.name.as_str()) {
                return Err(anyhow::anyhow!("Duplicate corpus name: {}", corpus.name));
            }
        }
        Ok(())
    }

    /// Rewrite relative corpus paths so they resolve against `root`
    pub fn resolve_paths(&mut self, root: &Path) {
        use rulebench_core::{RuleSource, TargetSource};
        for corpus in &mut self.corpora {
            if let RuleSource::Path { path } = &mut corpus.rules {
                if path.is_relative() {
                    *path = root.join(&*path);
                }
            }
            if let TargetSource::Path { path } = &mut corpus.target {
                if path.is_relative() {
                    *path = root.join(&*path);
                }
            }
        }
        let cache = Path::new(&self.cache.directory);
        if cache.is_relative() {
            self.cache.directory = root.join(cache).to_string_lossy().into_owned();
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# RuleBench Configuration

[runner]
# Executable and fixed leading arguments
tool = ["semgrep"]
# Environment variable carrying each variant's engine options
engine_env = "SEMGREP_CORE_EXTRA"
# Timeout per invocation ("none" disables it)
timeout = "none"
# Exit code meaning "analysis usable, some files failed to parse"
partial_exit_code = 3
# Request the timing breakdown (needed for throughput metrics)
time = true
# Number of corpuses run in parallel (uncomment to enable)
# jobs = 4

[cache]
# Fetched rule configs and checked-out corpuses
directory = "target/rulebench/cache"
# Registry base URL for rule-config identifiers
rules_url = "https://semgrep.dev/c"
fetch_timeout = "30s"

[output]
# Default output format: human, summary, json
format = "human"
# One duration per line (uncomment to enable)
# summary_file = "durations.txt"
# Full JSON report (uncomment to enable)
# report = "target/rulebench/report.json"
# Per-rule time table (uncomment to enable)
# rule_times = "target/rulebench/rule_times.json"

[upload]
# Dashboard base URL (uncomment to enable uploads)
# dashboard = "https://dashboard.example.com"
timeout = "10s"

[ci]
# Exit non-zero when a variant's findings differ from the baseline
fail_on_regression = false

[[corpus]]
name = "example"
rules = { path = "rules/example.yaml" }
target = { path = "input/example" }

# [[corpus]]
# name = "django"
# rules = { registry = ["p/django"] }
# target = { git = "https://github.com/django/django", commit = "3.2" }
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }

    /// Parse a timeout; "none", "off" and zero durations disable it
    pub fn parse_timeout(s: &str) -> anyhow::Result<Option<Duration>> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" | "never" => Ok(None),
            other => {
                let ns = Self::parse_duration(other)?;
                Ok((ns > 0).then(|| Duration::from_nanos(ns)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulebench_core::{RuleSource, TargetSource};

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.runner.tool, vec!["semgrep"]);
        assert_eq!(config.runner.engine_env, "SEMGREP_CORE_EXTRA");
        assert_eq!(config.runner.partial_exit_code, 3);
        assert!(config.runner.time);
        assert!(config.corpora.is_empty());
        assert_eq!(config.catalog().unwrap(), VariantCatalog::builtin());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(BenchConfig::parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(BenchConfig::parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(BenchConfig::parse_duration("100us").unwrap(), 100_000);
        assert_eq!(BenchConfig::parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(BenchConfig::parse_duration("1h").unwrap(), 3_600_000_000_000);
        assert_eq!(BenchConfig::parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(BenchConfig::parse_duration("45").unwrap(), 45_000_000_000);
        assert!(BenchConfig::parse_duration("fast").is_err());
        assert!(BenchConfig::parse_duration("5parsecs").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(BenchConfig::parse_timeout("none").unwrap(), None);
        assert_eq!(BenchConfig::parse_timeout("0").unwrap(), None);
        assert_eq!(
            BenchConfig::parse_timeout("90s").unwrap(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            tool = ["python3", "-m", "semgrep"]
            timeout = "20m"

            [[corpus]]
            name = "flask"
            rules = { registry = ["p/flask"] }
            target = { git = "https://github.com/pallets/flask", commit = "2.0.0" }

            [[corpus]]
            name = "local"
            rules = { path = "rules/local.yaml" }
            target = { path = "input/local" }

            [[variant]]
            name = "std"

            [[variant]]
            name = "no-bloom"
            engine_opts = "-no_bloom_filter"
        "#;

        let config: BenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.tool, vec!["python3", "-m", "semgrep"]);
        assert_eq!(config.runner.timeout, "20m");
        // Defaults should still apply
        assert_eq!(config.runner.partial_exit_code, 3);
        assert_eq!(config.output.format, "human");

        assert_eq!(config.corpora.len(), 2);
        assert!(matches!(config.corpora[0].rules, RuleSource::Registry { .. }));
        assert!(matches!(config.corpora[0].target, TargetSource::Git { .. }));
        assert!(config.validate_corpora().is_ok());

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.variants()[1].engine_opts, "-no_bloom_filter");
    }

    #[test]
    fn test_catalog_without_baseline_is_rejected() {
        let config: BenchConfig = toml::from_str(
            r#"
            [[variant]]
            name = "only-alt"
        "#,
        )
        .unwrap();
        assert!(config.catalog().is_err());
    }

    #[test]
    fn test_duplicate_corpus_is_rejected() {
        let mut config = BenchConfig::default();
        config.corpora.push(Corpus::local("a", "r", "t"));
        config.corpora.push(Corpus::local("a", "r2", "t2"));
        assert!(config.validate_corpora().is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = BenchConfig::default();
        config.corpora.push(Corpus::local("a", "rules.yaml", "/abs/target"));
        config.resolve_paths(Path::new("/project"));
        assert_eq!(
            config.corpora[0].rules,
            RuleSource::Path {
                path: PathBuf::from("/project/rules.yaml")
            }
        );
        assert_eq!(
            config.corpora[0].target,
            TargetSource::Path {
                path: PathBuf::from("/abs/target")
            }
        );
        assert_eq!(config.cache.directory, "/project/target/rulebench/cache");
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = BenchConfig::default_toml();
        let config: BenchConfig = toml::from_str(&default_toml).unwrap();
        assert_eq!(config.runner.timeout, "none");
        assert_eq!(config.corpora.len(), 1);
        assert!(config.validate_corpora().is_ok());
    }
}
