//! Card API load generator
//!
//! Two scenarios drive the card-management API through ramping
//! virtual-user profiles and check latency and error-rate thresholds at the
//! end of the run:
//!
//! - `peak-browse`: paginated, sorted card listings
//! - `steady-read`: single card detail reads
//!
//! Both binaries exit with status 99 when a threshold fails.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod profile;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod stats;
pub mod threshold;

// Re-export commonly used types
pub use client::{CardApiClient, RequestOutcome};
pub use config::Config;
pub use error::{LoadgenError, Result};
pub use profile::{LoadProfile, Stage};
pub use report::RunReport;
pub use runner::Runner;
pub use scenario::{PeakBrowse, Scenario, SteadyRead};
pub use threshold::Threshold;
