//! Metric aggregation for a run

use crate::client::RequestOutcome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Latency samples collected during a run
#[derive(Debug, Default, Clone)]
pub struct LatencyStats {
    pub samples: Vec<Duration>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sorted(&self) -> Vec<Duration> {
        let mut sorted = self.samples.clone();
        sorted.sort();
        sorted
    }

    /// Calculate percentile (0-100).
    ///
    /// Nearest rank, no interpolation: the sample at `round(p/100 * (n-1))`.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        percentile_of(&self.sorted(), p)
    }

    pub fn p95(&self) -> Option<Duration> {
        self.percentile(95.0)
    }

    pub fn p99(&self) -> Option<Duration> {
        self.percentile(99.0)
    }

    pub fn median(&self) -> Option<Duration> {
        self.percentile(50.0)
    }

    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Summarize in milliseconds, sorting once
    pub fn summary(&self) -> LatencySummary {
        let sorted = self.sorted();
        let ms = |d: Option<Duration>| d.map(as_millis_f64);

        LatencySummary {
            count: sorted.len(),
            avg_ms: ms(self.mean()),
            min_ms: ms(sorted.first().copied()),
            med_ms: ms(percentile_of(&sorted, 50.0)),
            max_ms: ms(sorted.last().copied()),
            p90_ms: ms(percentile_of(&sorted, 90.0)),
            p95_ms: ms(percentile_of(&sorted, 95.0)),
            p99_ms: ms(percentile_of(&sorted, 99.0)),
        }
    }
}

pub(crate) fn as_millis_f64(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Nearest-rank lookup over ascending samples
fn percentile_of(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }

    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

/// `http_req_duration` trend, in milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub med_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

/// Everything measured during one run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    /// Responses received, by status code
    pub status_counts: BTreeMap<u16, u64>,
    /// Requests that got no response, by failure kind
    pub failure_counts: BTreeMap<String, u64>,
    pub latencies: LatencyStats,
    pub vus_max: u64,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.http_reqs += 1;
        if outcome.is_failed() {
            self.http_req_failed += 1;
        }
        self.latencies.record(outcome.latency());

        match outcome {
            RequestOutcome::Response { status, .. } => {
                *self.status_counts.entry(*status).or_insert(0) += 1;
            }
            RequestOutcome::Failed { kind, .. } => {
                *self.failure_counts.entry(kind.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Calculate error rate as a fraction (0.0 to 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.http_reqs > 0 {
            self.http_req_failed as f64 / self.http_reqs as f64
        } else {
            0.0
        }
    }

    /// Requests per second over the whole run
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.http_reqs as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
