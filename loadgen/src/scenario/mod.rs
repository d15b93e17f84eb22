//! Load test scenarios
//!
//! A scenario decides what one iteration requests. Scheduling, timing and
//! metric collection are shared and live in the runner.

pub mod peak_browse;
pub mod steady_read;

pub use peak_browse::PeakBrowse;
pub use steady_read::SteadyRead;

use crate::error::Result;
use crate::profile::LoadProfile;
use crate::threshold::Threshold;
use rand::RngCore;

/// Latency budgets shared by both scenarios
pub const LATENCY_THRESHOLDS: &[(&str, &str)] = &[
    ("http_req_duration", "p(95)<500"),
    ("http_req_duration", "p(99)<1000"),
];

pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bearer token used when none is configured
    fn default_token(&self) -> &'static str;

    /// Stage ramp used when none is configured
    fn profile(&self) -> LoadProfile;

    fn thresholds(&self) -> Result<Vec<Threshold>>;

    /// URL for the next iteration's request
    fn request_url(&self, base_url: &str, rng: &mut dyn RngCore) -> String;
}

pub(crate) fn parse_thresholds(pairs: &[(&str, &str)]) -> Result<Vec<Threshold>> {
    pairs
        .iter()
        .map(|(metric, expression)| Threshold::parse(metric, expression))
        .collect()
}
