//! Shared entry point for the scenario binaries

use crate::config::Config;
use crate::error::{LoadgenError, Result};
use crate::runner::Runner;
use crate::scenario::Scenario;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when at least one threshold failed
pub const THRESHOLDS_FAILED_EXIT_CODE: u8 = 99;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "card_loadgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Serve live metrics in Prometheus format on `addr`
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| LoadgenError::Metrics(e.to_string()))
}

/// Run `scenario`, print the summary and map threshold results to an exit code
pub async fn run(config: Config, scenario: Arc<dyn Scenario>) -> anyhow::Result<ExitCode> {
    if let Some(addr) = config.prometheus_addr {
        install_prometheus(addr)?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let summary_export = config.summary_export.clone();
    let runner = Runner::new(config, scenario)?;
    let report = runner.run_until(shutdown_signal()).await?;

    println!("{}", report.render());

    if let Some(path) = summary_export {
        report.export(&path)?;
        info!("Summary written to {:?}", path);
    }

    if report.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        for t in report.failed_thresholds() {
            warn!("Threshold crossed: {}: {}", t.metric, t.expression);
        }
        Ok(ExitCode::from(THRESHOLDS_FAILED_EXIT_CODE))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
