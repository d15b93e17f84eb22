use card_loadgen::{Config, PeakBrowse, cli};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    cli::init_tracing();

    let config = Config::from_env()?;
    cli::run(config, Arc::new(PeakBrowse::new())).await
}
