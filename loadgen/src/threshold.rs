//! Pass/fail thresholds evaluated at the end of a run
//!
//! Expressions follow the familiar `<aggregate><op><value>` form, e.g.
//! `p(95)<500` on `http_req_duration` (milliseconds) or `rate<0.05` on
//! `http_req_failed`.

use crate::error::{LoadgenError, Result};
use crate::stats::{RunSummary, as_millis_f64};
use serde::Serialize;
use std::fmt;

/// Metrics a threshold can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Request latency trend, in milliseconds
    HttpReqDuration,
    /// Fraction of requests that failed
    HttpReqFailed,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::HttpReqDuration => "http_req_duration",
            Metric::HttpReqFailed => "http_req_failed",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "http_req_duration" => Ok(Metric::HttpReqDuration),
            "http_req_failed" => Ok(Metric::HttpReqFailed),
            other => Err(LoadgenError::InvalidThreshold(format!(
                "unknown metric '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Avg,
    Min,
    Med,
    Max,
    Percentile(f64),
    Rate,
}

impl Aggregate {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "avg" => Ok(Aggregate::Avg),
            "min" => Ok(Aggregate::Min),
            "med" => Ok(Aggregate::Med),
            "max" => Ok(Aggregate::Max),
            "rate" => Ok(Aggregate::Rate),
            _ => {
                let p = s
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|p| p.parse::<f64>().ok())
                    .filter(|p| (0.0..=100.0).contains(p))
                    .ok_or_else(|| {
                        LoadgenError::InvalidThreshold(format!("unknown aggregate '{}'", s))
                    })?;
                Ok(Aggregate::Percentile(p))
            }
        }
    }

    fn applies_to(&self, metric: Metric) -> bool {
        match self {
            Aggregate::Rate => metric == Metric::HttpReqFailed,
            _ => metric == Metric::HttpReqDuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    fn holds(&self, observed: f64, limit: f64) -> bool {
        match self {
            Operator::Lt => observed < limit,
            Operator::Le => observed <= limit,
            Operator::Gt => observed > limit,
            Operator::Ge => observed >= limit,
        }
    }
}

/// A condition on one aggregated metric
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: Metric,
    pub aggregate: Aggregate,
    pub op: Operator,
    pub value: f64,
    expression: String,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self> {
        let metric = Metric::parse(metric)?;
        let expr: String = expression.chars().filter(|c| !c.is_whitespace()).collect();

        let op_idx = expr.find(['<', '>']).ok_or_else(|| {
            LoadgenError::InvalidThreshold(format!("missing comparison in '{}'", expression))
        })?;
        let (lhs, rest) = expr.split_at(op_idx);
        let (op, rhs) = if let Some(rhs) = rest.strip_prefix("<=") {
            (Operator::Le, rhs)
        } else if let Some(rhs) = rest.strip_prefix(">=") {
            (Operator::Ge, rhs)
        } else if let Some(rhs) = rest.strip_prefix('<') {
            (Operator::Lt, rhs)
        } else {
            (Operator::Gt, &rest[1..])
        };

        let aggregate = Aggregate::parse(lhs)?;
        if !aggregate.applies_to(metric) {
            return Err(LoadgenError::InvalidThreshold(format!(
                "'{}' cannot be applied to {}",
                lhs,
                metric.name()
            )));
        }

        let value = rhs.parse::<f64>().map_err(|_| {
            LoadgenError::InvalidThreshold(format!("invalid value in '{}'", expression))
        })?;

        Ok(Self {
            metric,
            aggregate,
            op,
            value,
            expression: expr,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The aggregated value this threshold compares, if any samples exist
    pub fn observe(&self, summary: &RunSummary) -> Option<f64> {
        let latencies = &summary.latencies;
        let duration = match self.aggregate {
            Aggregate::Rate => return Some(summary.error_rate()),
            Aggregate::Avg => latencies.mean(),
            Aggregate::Min => latencies.min(),
            Aggregate::Med => latencies.median(),
            Aggregate::Max => latencies.max(),
            Aggregate::Percentile(p) => latencies.percentile(p),
        };
        duration.map(as_millis_f64)
    }

    /// A metric without samples passes
    pub fn evaluate(&self, summary: &RunSummary) -> ThresholdOutcome {
        let observed = self.observe(summary);
        let passed = observed
            .map(|v| self.op.holds(v, self.value))
            .unwrap_or(true);

        ThresholdOutcome {
            metric: self.metric.name(),
            expression: self.expression.clone(),
            observed,
            passed,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric.name(), self.expression)
    }
}

/// Result of checking one threshold
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdOutcome {
    pub metric: &'static str,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

pub fn evaluate_all(thresholds: &[Threshold], summary: &RunSummary) -> Vec<ThresholdOutcome> {
    thresholds.iter().map(|t| t.evaluate(summary)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FailureKind, RequestOutcome};
    use std::time::Duration;

    fn summary_with_latencies(values_ms: &[u64]) -> RunSummary {
        let mut summary = RunSummary::new();
        for v in values_ms {
            summary.record(&RequestOutcome::Response {
                status: 200,
                latency: Duration::from_millis(*v),
            });
        }
        summary
    }

    #[test]
    fn test_parse_expressions() {
        let t = Threshold::parse("http_req_duration", "p(95)<500").unwrap();
        assert_eq!(t.metric, Metric::HttpReqDuration);
        assert_eq!(t.aggregate, Aggregate::Percentile(95.0));
        assert_eq!(t.op, Operator::Lt);
        assert_eq!(t.value, 500.0);
        assert_eq!(t.to_string(), "http_req_duration: p(95)<500");

        let t = Threshold::parse("http_req_failed", "rate < 0.05").unwrap();
        assert_eq!(t.aggregate, Aggregate::Rate);
        assert_eq!(t.value, 0.05);
        assert_eq!(t.expression(), "rate<0.05");

        let t = Threshold::parse("http_req_duration", "avg<=200").unwrap();
        assert_eq!(t.op, Operator::Le);

        let t = Threshold::parse("http_req_duration", "p(99.9)>=1").unwrap();
        assert_eq!(t.aggregate, Aggregate::Percentile(99.9));
        assert_eq!(t.op, Operator::Ge);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(Threshold::parse("http_reqs", "count<10").is_err());
        assert!(Threshold::parse("http_req_duration", "p(95)").is_err());
        assert!(Threshold::parse("http_req_duration", "p(101)<5").is_err());
        assert!(Threshold::parse("http_req_duration", "rate<0.1").is_err());
        assert!(Threshold::parse("http_req_failed", "p(95)<500").is_err());
        assert!(Threshold::parse("http_req_duration", "p(95)<fast").is_err());
        assert!(Threshold::parse("http_req_duration", "mean<5").is_err());
    }

    #[test]
    fn test_p95_of_600ms_fails_budget() {
        let summary = summary_with_latencies(&[600; 100]);
        let outcome = Threshold::parse("http_req_duration", "p(95)<500")
            .unwrap()
            .evaluate(&summary);

        assert!(!outcome.passed);
        assert_eq!(outcome.observed, Some(600.0));
    }

    #[test]
    fn test_latency_within_budget_passes() {
        let mut values: Vec<u64> = vec![100; 95];
        values.extend([900; 5]);
        let summary = summary_with_latencies(&values);

        let p95 = Threshold::parse("http_req_duration", "p(95)<500").unwrap();
        let p99 = Threshold::parse("http_req_duration", "p(99)<1000").unwrap();
        assert!(p95.evaluate(&summary).passed);
        assert!(p99.evaluate(&summary).passed);

        let max = Threshold::parse("http_req_duration", "max<500").unwrap();
        assert!(!max.evaluate(&summary).passed);
    }

    #[test]
    fn test_failure_rate_threshold() {
        let mut summary = summary_with_latencies(&[10; 9]);
        summary.record(&RequestOutcome::Failed {
            kind: FailureKind::Connect,
            latency: Duration::from_millis(1),
        });

        let strict = Threshold::parse("http_req_failed", "rate<0.05").unwrap();
        let loose = Threshold::parse("http_req_failed", "rate<0.1").unwrap();
        let outcomes = evaluate_all(&[strict, loose], &summary);

        assert_eq!(outcomes[0].observed, Some(0.1));
        assert!(!outcomes[0].passed);
        // 0.1 is not strictly below 0.1
        assert!(!outcomes[1].passed);
    }

    #[test]
    fn test_no_samples_passes() {
        let summary = RunSummary::new();
        let t = Threshold::parse("http_req_duration", "p(99)<1000").unwrap();
        let outcome = t.evaluate(&summary);
        assert!(outcome.passed);
        assert_eq!(outcome.observed, None);

        let rate = Threshold::parse("http_req_failed", "rate<0.05").unwrap();
        assert!(rate.evaluate(&summary).passed);
    }
}
