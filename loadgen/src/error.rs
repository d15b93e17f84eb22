//! Error types for load test setup and reporting

use thiserror::Error;

/// Errors raised while preparing or finishing a run.
///
/// Request failures during a run are never surfaced here; they are counted
/// in the `http_req_failed` metric instead.
#[derive(Debug, Error)]
pub enum LoadgenError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid value for {var}: {message}")]
    Config { var: &'static str, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(String),

    #[error("Collector task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoadgenError>;
