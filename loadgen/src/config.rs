//! Load test configuration
//!
//! Defaults target a card service on localhost. Each default can be
//! overridden from the environment so that expired tokens or a different
//! target do not require a rebuild.

use crate::error::{LoadgenError, Result};
use crate::profile::LoadProfile;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

pub const BASE_URL: &str = "http://localhost:8991/api/v1";
pub const USER_ID: Uuid = Uuid::from_u128(0x155b6ead_fd41_437d_b5e0_652440e7dfcd);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const THINK_TIME: Duration = Duration::from_millis(100);

/// Run configuration shared by both scenarios
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Bearer token; `None` uses the scenario's built-in token
    pub jwt_token: Option<String>,
    /// User the card-detail reads are scoped to
    pub user_id: Uuid,
    /// Total per-request timeout
    pub request_timeout: Duration,
    /// Pause after each iteration
    pub think_time: Duration,
    /// How often the runner re-evaluates the VU target
    pub tick: Duration,
    /// Replaces the scenario's stage ramp
    pub stages: Option<LoadProfile>,
    /// Where to write the JSON report
    pub summary_export: Option<PathBuf>,
    /// Prometheus listener address
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            jwt_token: None,
            user_id: USER_ID,
            request_timeout: REQUEST_TIMEOUT,
            think_time: THINK_TIME,
            tick: Duration::from_millis(100),
            stages: None,
            summary_export: None,
            prometheus_addr: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LOADGEN_BASE_URL")
            && !url.is_empty()
        {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("LOADGEN_JWT_TOKEN")
            && !token.is_empty()
        {
            config.jwt_token = Some(token);
        }
        if let Some(val) = lookup("LOADGEN_USER_ID")
            && !val.is_empty()
        {
            config.user_id = Uuid::parse_str(val.trim()).map_err(|e| LoadgenError::Config {
                var: "LOADGEN_USER_ID",
                message: e.to_string(),
            })?;
        }
        if let Some(val) = lookup("LOADGEN_STAGES")
            && !val.is_empty()
        {
            config.stages = Some(LoadProfile::parse(&val)?);
        }
        if let Some(path) = lookup("LOADGEN_SUMMARY_EXPORT")
            && !path.is_empty()
        {
            config.summary_export = Some(PathBuf::from(path));
        }
        if let Some(val) = lookup("LOADGEN_PROMETHEUS_ADDR")
            && !val.is_empty()
        {
            let addr = val.parse::<SocketAddr>().map_err(|_| LoadgenError::Config {
                var: "LOADGEN_PROMETHEUS_ADDR",
                message: format!("'{}' is not a socket address", val),
            })?;
            config.prometheus_addr = Some(addr);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8991/api/v1");
        assert_eq!(
            config.user_id.to_string(),
            "155b6ead-fd41-437d-b5e0-652440e7dfcd"
        );
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.think_time, Duration::from_millis(100));
        assert!(config.jwt_token.is_none());
        assert!(config.stages.is_none());
    }

    #[test]
    fn test_empty_environment_keeps_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, BASE_URL);
        assert!(config.summary_export.is_none());
        assert!(config.prometheus_addr.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LOADGEN_BASE_URL", "http://cards.internal:9000/api/v1/"),
            ("LOADGEN_JWT_TOKEN", "fresh-token"),
            ("LOADGEN_USER_ID", "00000000-0000-0000-0000-000000000001"),
            ("LOADGEN_STAGES", "5s:2,5s:0"),
            ("LOADGEN_SUMMARY_EXPORT", "summary.json"),
            ("LOADGEN_PROMETHEUS_ADDR", "127.0.0.1:9464"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://cards.internal:9000/api/v1");
        assert_eq!(config.jwt_token.as_deref(), Some("fresh-token"));
        assert_eq!(
            config.user_id.to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
        assert_eq!(
            config.stages.unwrap().total_duration(),
            Duration::from_secs(10)
        );
        assert_eq!(config.summary_export, Some(PathBuf::from("summary.json")));
        assert_eq!(config.prometheus_addr.unwrap().port(), 9464);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            ("LOADGEN_BASE_URL", ""),
            ("LOADGEN_JWT_TOKEN", ""),
            ("LOADGEN_USER_ID", ""),
            ("LOADGEN_STAGES", ""),
            ("LOADGEN_SUMMARY_EXPORT", ""),
            ("LOADGEN_PROMETHEUS_ADDR", ""),
        ]))
        .unwrap();

        assert_eq!(config.base_url, BASE_URL);
        assert!(config.jwt_token.is_none());
        assert_eq!(config.user_id, USER_ID);
        assert!(config.stages.is_none());
        assert!(config.summary_export.is_none());
        assert!(config.prometheus_addr.is_none());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(Config::from_lookup(lookup_from(&[("LOADGEN_USER_ID", "nope")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("LOADGEN_STAGES", "fast")])).is_err());
        assert!(
            Config::from_lookup(lookup_from(&[("LOADGEN_PROMETHEUS_ADDR", "localhost")])).is_err()
        );
    }
}
