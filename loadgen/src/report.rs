//! End-of-run report

use crate::error::Result;
use crate::stats::{LatencySummary, RunSummary};
use crate::threshold::ThresholdOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// Aggregated metrics and threshold results of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub vus_max: u64,
    pub iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub http_req_failed_rate: f64,
    /// Requests per second
    pub throughput: f64,
    pub http_req_duration: LatencySummary,
    pub status_counts: BTreeMap<u16, u64>,
    pub failure_counts: BTreeMap<String, u64>,
    pub thresholds: Vec<ThresholdOutcome>,
    pub passed: bool,
}

impl RunReport {
    pub fn new(
        scenario: &'static str,
        started_at: DateTime<Utc>,
        summary: &RunSummary,
        thresholds: Vec<ThresholdOutcome>,
    ) -> Self {
        let passed = thresholds.iter().all(|t| t.passed);

        Self {
            scenario,
            started_at,
            duration_secs: summary.duration.as_secs_f64(),
            vus_max: summary.vus_max,
            iterations: summary.iterations,
            http_reqs: summary.http_reqs,
            http_req_failed: summary.http_req_failed,
            http_req_failed_rate: summary.error_rate(),
            throughput: summary.throughput(),
            http_req_duration: summary.latencies.summary(),
            status_counts: summary.status_counts.clone(),
            failure_counts: summary.failure_counts.clone(),
            thresholds,
            passed,
        }
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| !t.passed)
    }

    /// Human-readable summary
    pub fn render(&self) -> String {
        let mut out = String::new();
        let ms = |v: Option<f64>| match v {
            Some(v) => format!("{:.2}ms", v),
            None => "N/A".to_string(),
        };
        let d = &self.http_req_duration;

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(
            out,
            " SUMMARY: {} ({:.1}s, started {})",
            self.scenario,
            self.duration_secs,
            self.started_at.to_rfc3339()
        );
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(
            out,
            "  http_reqs..........: {} ({:.1}/s)",
            self.http_reqs, self.throughput
        );
        let _ = writeln!(
            out,
            "  http_req_duration..: avg={} min={} med={} max={} p(90)={} p(95)={} p(99)={}",
            ms(d.avg_ms),
            ms(d.min_ms),
            ms(d.med_ms),
            ms(d.max_ms),
            ms(d.p90_ms),
            ms(d.p95_ms),
            ms(d.p99_ms)
        );
        let _ = writeln!(
            out,
            "  http_req_failed....: {:.2}% ({} of {})",
            self.http_req_failed_rate * 100.0,
            self.http_req_failed,
            self.http_reqs
        );
        let _ = writeln!(out, "  iterations.........: {}", self.iterations);
        let _ = writeln!(out, "  vus_max............: {}", self.vus_max);

        if !self.status_counts.is_empty() {
            let statuses: Vec<String> = self
                .status_counts
                .iter()
                .map(|(status, count)| format!("{}={}", status, count))
                .collect();
            let _ = writeln!(out, "  status codes.......: {}", statuses.join(" "));
        }
        if !self.failure_counts.is_empty() {
            let failures: Vec<String> = self
                .failure_counts
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            let _ = writeln!(out, "  no response........: {}", failures.join(" "));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, " THRESHOLDS");
        for t in &self.thresholds {
            let mark = if t.passed { "✓" } else { "✗" };
            let observed = match t.observed {
                Some(v) => format!("{:.4}", v),
                None => "no samples".to_string(),
            };
            let _ = writeln!(
                out,
                "  {} {}: {} (observed {})",
                mark, t.metric, t.expression, observed
            );
        }

        let _ = writeln!(out, "{}", RULE);
        let _ = write!(
            out,
            " RESULT: {}",
            if self.passed { "PASSED" } else { "FAILED" }
        );
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`
    pub fn export(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
