//! Twitter harvester
//!
//! Single-binary service that:
//! 1. Loads credentials and a job from TOML
//! 2. Optionally exposes Prometheus metrics
//! 3. Runs the job (sample stream, filter stream, search, timeline or
//!    follower ids), writing one JSON document or id per line to stdout
//! 4. Stops cleanly on SIGINT/SIGTERM

mod config;
mod job;
mod metrics;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitter_client::Client;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the harvested data.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    info!("starting twitter-harvester");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        credentials = config.credentials.len(),
        job = config.job.name(),
        api_base = %config.client.api_base,
        "configuration loaded"
    );

    if let Some(addr) = config.metrics.listen_addr {
        metrics::install_exporter(addr)?;
        info!(addr = %addr, "metrics exporter listening");
    }

    let mut client =
        Client::new(config.credentials, config.client).context("failed to create client")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let mut stdout = tokio::io::stdout();
    let result = job::run(&mut client, &config.job, cancel, &mut stdout).await;
    client.close();

    let written = result?;
    info!(written, "harvest complete");
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
    token.cancel();
}
