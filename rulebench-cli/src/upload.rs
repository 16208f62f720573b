//! Dashboard Upload
//!
//! Publishes results to a metrics dashboard:
//!
//! - `POST {dashboard}/api/metric/{name}` with a scalar as text body
//! - `POST {dashboard}/api/stats/{corpus}` with the baseline timing breakdown
//!
//! Upload failures are logged and counted, never fatal.

use crate::executor::CorpusRun;
use reqwest::blocking::Client;
use rulebench_core::Timings;
use rulebench_report::BenchmarkOutcome;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Why one upload request failed
#[derive(Debug, Error)]
pub enum UploadError {
    /// Transport failure or non-success status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for benchmark metrics
pub trait MetricsSink {
    /// Publish one named scalar
    fn send_metric(&self, name: &str, value: f64) -> Result<(), UploadError>;

    /// Publish the timing breakdown of a corpus's baseline run
    fn send_stats(&self, corpus: &str, timings: &Timings) -> Result<(), UploadError>;
}

/// HTTP client for the dashboard API
pub struct DashboardClient {
    base_url: String,
    client: Client,
}

impl DashboardClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Endpoint for one named scalar
    pub fn metric_url(&self, name: &str) -> String {
        format!("{}/api/metric/{}", self.base_url, name)
    }

    /// Endpoint for a corpus's timing breakdown
    pub fn stats_url(&self, corpus: &str) -> String {
        format!("{}/api/stats/{}", self.base_url, corpus)
    }
}

impl MetricsSink for DashboardClient {
    fn send_metric(&self, name: &str, value: f64) -> Result<(), UploadError> {
        self.client
            .post(self.metric_url(name))
            .body(value.to_string())
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn send_stats(&self, corpus: &str, timings: &Timings) -> Result<(), UploadError> {
        let body = serde_json::to_string(timings)?;
        self.client
            .post(self.stats_url(corpus))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Metric names and values derived from one outcome
pub fn outcome_metrics(outcome: &BenchmarkOutcome) -> Vec<(String, f64)> {
    let mut metrics = Vec::new();
    let prefix = format!("rulebench.{}.{}", outcome.corpus, outcome.variant);
    if let Some(duration) = outcome.duration_s {
        metrics.push((format!("{prefix}.duration"), duration));
    }
    if let Some(throughput) = &outcome.throughput {
        metrics.push((format!("{prefix}.bps"), throughput.bytes_per_second));
        metrics.push((format!("{prefix}.lps"), throughput.lines_per_second));
    }
    metrics
}

/// Publish every metric and baseline breakdown; returns the number of failed uploads
pub fn upload_results(sink: &dyn MetricsSink, runs: &[CorpusRun]) -> usize {
    let mut failures = 0;
    for run in runs {
        for outcome in &run.outcomes {
            for (name, value) in outcome_metrics(outcome) {
                debug!(%name, value, "uploading metric");
                if let Err(e) = sink.send_metric(&name, value) {
                    warn!(%name, error = %e, "metric upload failed");
                    failures += 1;
                }
            }
        }
        if let Some(timings) = &run.baseline_timings {
            if let Err(e) = sink.send_stats(&run.corpus, timings) {
                warn!(corpus = %run.corpus, error = %e, "stats upload failed");
                failures += 1;
            }
        }
    }
    failures
}
