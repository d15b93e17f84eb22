use card_loadgen::{Config, SteadyRead, cli};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    cli::init_tracing();

    let config = Config::from_env()?;
    let scenario = SteadyRead::new(config.user_id);
    cli::run(config, Arc::new(scenario)).await
}
