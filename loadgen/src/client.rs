//! HTTP client for the card API
//!
//! Every request carries the same JSON content type and bearer credential and
//! is bounded by one total timeout. Requests never fail the caller: the
//! outcome is always reported as a metric sample.

use crate::error::{LoadgenError, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Why a request produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Connect,
    Request,
}

impl From<&reqwest::Error> for FailureKind {
    fn from(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            FailureKind::Timeout
        } else if e.is_connect() {
            FailureKind::Connect
        } else {
            FailureKind::Request
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Request => "request",
        };
        f.write_str(s)
    }
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Response { status: u16, latency: Duration },
    Failed { kind: FailureKind, latency: Duration },
}

impl RequestOutcome {
    pub fn latency(&self) -> Duration {
        match self {
            RequestOutcome::Response { latency, .. } | RequestOutcome::Failed { latency, .. } => {
                *latency
            }
        }
    }

    /// Counts toward `http_req_failed`: no response, or a status outside 200-399
    pub fn is_failed(&self) -> bool {
        match self {
            RequestOutcome::Response { status, .. } => !(200..400).contains(status),
            RequestOutcome::Failed { .. } => true,
        }
    }
}

/// Headers sent with every request
pub fn request_headers(token: &str) -> Result<HeaderMap> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
        LoadgenError::Config {
            var: "LOADGEN_JWT_TOKEN",
            message: e.to_string(),
        }
    })?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}

/// Shared, cloneable client used by every VU of a run
#[derive(Debug, Clone)]
pub struct CardApiClient {
    http: Client,
    timeout: Duration,
}

impl CardApiClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .default_headers(request_headers(token)?)
            .pool_max_idle_per_host(200)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a GET and time it through the end of the body
    pub async fn get(&self, url: &str) -> RequestOutcome {
        let start = Instant::now();

        let result = async {
            let resp = self.http.get(url).send().await?;
            let status = resp.status();
            resp.bytes().await?;
            Ok::<_, reqwest::Error>(status)
        }
        .await;

        let latency = start.elapsed();
        match result {
            Ok(status) => RequestOutcome::Response {
                status: status.as_u16(),
                latency,
            },
            Err(e) => {
                debug!("Request to {} failed: {}", url, e);
                RequestOutcome::Failed {
                    kind: FailureKind::from(&e),
                    latency,
                }
            }
        }
    }
}
