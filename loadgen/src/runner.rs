//! Ramping-VU executor
//!
//! The control loop follows the stage ramp, spawning VU tasks as the target
//! rises and publishing the current target through a watch channel. VU `n`
//! iterates while `n < target`; when the target drops it finishes its
//! iteration and parks until the target rises again. At the end of the
//! profile every in-flight request and pause is abandoned.

use crate::client::{CardApiClient, RequestOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::profile::LoadProfile;
use crate::report::RunReport;
use crate::scenario::Scenario;
use crate::stats::RunSummary;
use crate::threshold::{Threshold, evaluate_all};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Outcomes buffered between VUs and the collector
const EVENT_BUFFER: usize = 50_000;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default)]
struct VuControl {
    target: u64,
    stopped: bool,
}

/// Runs one scenario through its stage ramp
pub struct Runner {
    config: Config,
    scenario: Arc<dyn Scenario>,
    profile: LoadProfile,
    thresholds: Vec<Threshold>,
}

impl Runner {
    pub fn new(config: Config, scenario: Arc<dyn Scenario>) -> Result<Self> {
        let profile = config
            .stages
            .clone()
            .unwrap_or_else(|| scenario.profile());
        let thresholds = scenario.thresholds()?;

        Ok(Self {
            config,
            scenario,
            profile,
            thresholds,
        })
    }

    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Run the full profile
    pub async fn run(&self) -> Result<RunReport> {
        self.run_until(std::future::pending()).await
    }

    /// Run the profile, stopping early if `shutdown` resolves first
    pub async fn run_until<F>(&self, shutdown: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let name = self.scenario.name();
        let token = self
            .config
            .jwt_token
            .as_deref()
            .unwrap_or(self.scenario.default_token());
        let client = CardApiClient::new(token, self.config.request_timeout)?;

        let started_at = chrono::Utc::now();
        let total = self.profile.total_duration();
        info!(
            "Starting {} against {} for {:?} (stages: {})",
            name, self.config.base_url, total, self.profile
        );

        let (event_tx, mut event_rx) = mpsc::channel::<RequestOutcome>(EVENT_BUFFER);
        let collector = tokio::spawn(async move {
            let mut summary = RunSummary::new();
            while let Some(outcome) = event_rx.recv().await {
                summary.record(&outcome);
            }
            summary
        });

        let (control_tx, control_rx) = watch::channel(VuControl::default());
        let iterations = Arc::new(AtomicU64::new(0));
        let mut vus = JoinSet::new();
        let mut spawned = 0u64;
        let mut last_target = 0u64;
        let mut last_progress = Instant::now();

        let start = Instant::now();
        tokio::pin!(shutdown);

        loop {
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = self.profile.target_at(elapsed);
            publish_target(&control_tx, target);

            while spawned < target {
                let vu = Vu {
                    id: spawned,
                    scenario: self.scenario.clone(),
                    client: client.clone(),
                    base_url: self.config.base_url.clone(),
                    think_time: self.config.think_time,
                    control: control_rx.clone(),
                    events: event_tx.clone(),
                    iterations: iterations.clone(),
                };
                vus.spawn(vu.run());
                spawned += 1;
            }

            if target != last_target {
                debug!("{}: target {} VUs at {:?}", name, target, elapsed);
                metrics::gauge!("loadgen_vus", "scenario" => name).set(target as f64);
                last_target = target;
            }

            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                info!(
                    "{}: {:.0}s/{:.0}s, {} VUs, {} iterations",
                    name,
                    elapsed.as_secs_f64(),
                    total.as_secs_f64(),
                    target,
                    iterations.load(Ordering::Relaxed)
                );
                last_progress = Instant::now();
            }

            let wait = self.config.tick.min(total - elapsed);
            tokio::select! {
                _ = sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("Stop requested, ending {} early", name);
                    break;
                }
            }
        }

        control_tx.send_replace(VuControl {
            target: 0,
            stopped: true,
        });
        metrics::gauge!("loadgen_vus", "scenario" => name).set(0.0);

        while let Some(res) = vus.join_next().await {
            if let Err(e) = res {
                warn!("VU task failed: {}", e);
            }
        }

        drop(event_tx);
        let mut summary = collector.await?;
        summary.iterations = iterations.load(Ordering::Relaxed);
        summary.vus_max = spawned;
        summary.duration = start.elapsed();

        let outcomes = evaluate_all(&self.thresholds, &summary);
        let report = RunReport::new(name, started_at, &summary, outcomes);

        info!(
            "Finished {}: {} requests, {:.2}% failed, thresholds {}",
            name,
            report.http_reqs,
            report.http_req_failed_rate * 100.0,
            if report.passed { "passed" } else { "failed" }
        );

        Ok(report)
    }
}

/// One virtual user
struct Vu {
    id: u64,
    scenario: Arc<dyn Scenario>,
    client: CardApiClient,
    base_url: String,
    think_time: Duration,
    control: watch::Receiver<VuControl>,
    events: mpsc::Sender<RequestOutcome>,
    iterations: Arc<AtomicU64>,
}

impl Vu {
    async fn run(mut self) {
        let mut rng = StdRng::from_os_rng();
        let name = self.scenario.name();

        loop {
            let control = *self.control.borrow_and_update();
            if control.stopped {
                break;
            }
            if self.id >= control.target {
                if self.control.changed().await.is_err() {
                    break;
                }
                continue;
            }

            let url = self.scenario.request_url(&self.base_url, &mut rng);
            let outcome = tokio::select! {
                outcome = self.client.get(&url) => outcome,
                _ = stopped(&mut self.control) => break,
            };

            record_metrics(name, &outcome);
            if self.events.send(outcome).await.is_err() {
                break;
            }

            tokio::select! {
                _ = sleep(self.think_time) => {}
                _ = stopped(&mut self.control) => break,
            }

            self.iterations.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("loadgen_iterations_total", "scenario" => name).increment(1);
        }
    }
}

/// Wake VUs only when the target actually moves
fn publish_target(control: &watch::Sender<VuControl>, target: u64) -> bool {
    control.send_if_modified(|c| {
        if c.target == target {
            return false;
        }
        c.target = target;
        true
    })
}

/// Resolves once the run is over
async fn stopped(control: &mut watch::Receiver<VuControl>) {
    let _ = control.wait_for(|c| c.stopped).await;
}

fn record_metrics(scenario: &'static str, outcome: &RequestOutcome) {
    metrics::counter!("loadgen_http_reqs_total", "scenario" => scenario).increment(1);
    if outcome.is_failed() {
        metrics::counter!("loadgen_http_req_failed_total", "scenario" => scenario).increment(1);
    }
    metrics::histogram!("loadgen_http_req_duration_seconds", "scenario" => scenario)
        .record(outcome.latency().as_secs_f64());
}
