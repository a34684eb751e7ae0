//! Wait-Times Gateway - caching proxy for theme-park ride wait-time APIs

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use wait_times_gateway::{
    cli::{Cli, Command},
    config::Config,
    gateway::Gateway,
    setup_tracing,
    upstream::UpstreamClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Fetch { ride_id }) => run_fetch(&cli, ride_id).await,
        Some(Command::Serve) | None => run_server(&cli).await,
    }
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> wait_times_gateway::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    Ok(config)
}

/// Run the gateway server
async fn run_server(cli: &Cli) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        upstream = %config.upstream.base_url,
        "Starting wait-times gateway"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}

/// Fetch the upstream feed once and print it (bypasses the cache)
async fn run_fetch(cli: &Cli, ride_id: Option<i64>) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let upstream = match UpstreamClient::new(&config.upstream) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create upstream client: {e}");
            return ExitCode::FAILURE;
        }
    };

    match upstream.fetch_wait_times(ride_id).await {
        Ok(payload) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_default()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Fetch failed: {e}");
            ExitCode::FAILURE
        }
    }
}
