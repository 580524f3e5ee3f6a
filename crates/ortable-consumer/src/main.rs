//! OR Table Consumer
//!
//! Menu-driven consumer for the OR table demo provider. It locates the
//! provider, follows its report log in the background and lets an operator
//! move the table from the terminal.
//!
//! # Architecture
//!
//! 1. Read configuration from `ORTABLE_*` environment variables
//! 2. Probe the provider's description endpoint until it answers
//! 3. Start the report poller
//! 4. Run the menu on stdin until `z`, end of input or a shutdown signal
//!
//! # Environment Variables
//!
//! - `ORTABLE_PROVIDER_URL`: Optional. Provider base URL (default: http://127.0.0.1:10000)
//! - `ORTABLE_TARGET_EPR`: Optional. Endpoint reference the provider must carry
//! - `ORTABLE_LOCAL_ADDRESS`: Optional. Source IP address for requests
//! - `ORTABLE_DISCOVERY_MS`: Optional. Discovery window (default: 3000)
//! - `ORTABLE_POLL_INTERVAL_MS`: Optional. Report poll interval (default: 500)
//! - `ORTABLE_LOG_LEVEL` / `RUST_LOG`: Optional. Logging filter (default: info)

mod client;
mod config;
mod discovery;
mod menu;
mod poller;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::client::OrTableClient;
use crate::config::{env_vars, ConsumerConfig};
use crate::poller::ReportPoller;

/// File the consumer logs to, next to the working directory.
const LOG_FILE: &str = "ortable-consumer.log";

/// Setup signal handlers for graceful shutdown
fn setup_signal_handlers() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let (Ok(mut sigint), Ok(mut sigterm)) = (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) else {
                warn!("Failed to install signal handlers");
                std::future::pending::<()>().await;
                return;
            };

            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown..."),
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown..."),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, initiating shutdown...");
        }

        let _ = tx.send(());
    });

    rx
}

fn build_filter() -> Result<tracing_subscriber::EnvFilter> {
    use tracing_subscriber::EnvFilter;

    let level = std::env::var(env_vars::LOG_LEVEL).unwrap_or_else(|_| "info".to_string());
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?)
}

/// Initialize logging to stderr and to the consumer log file.
///
/// Stdout is left to the menu.
fn init_logging() -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*};

    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(build_filter()?)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(non_blocking_file),
        )
        .init();

    Ok(guard)
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;

    info!("OR table consumer starting...");

    let config = ConsumerConfig::from_env().context("Failed to load configuration")?;

    info!(
        provider = %config.provider_url,
        target = config.target_endpoint_reference.as_deref().unwrap_or("any"),
        local_address = ?config.local_address,
        "Configuration loaded"
    );

    let shutdown_rx = setup_signal_handlers();

    let client = OrTableClient::new(&config)?;
    let description = discovery::discover(
        &client,
        config.target_endpoint_reference.as_deref(),
        config.max_discovery_time,
    )
    .await
    .context("Discovery failed")?;

    info!(
        endpoint_reference = %description.endpoint_reference,
        model = %description.model.model_name,
        firmware = %description.device.firmware_version,
        "Connected to provider"
    );

    let poller = ReportPoller::spawn(client.clone(), config.poll_interval);

    let stdin = BufReader::new(tokio::io::stdin());
    let result = menu::run(&client, stdin, shutdown_rx).await;

    info!("Cleaning up...");
    let stats = poller.stop().await;
    info!(
        reports = stats.received,
        failed_polls = stats.failures,
        last_sequence = stats.last_sequence,
        "OR table consumer shutdown complete"
    );

    result
}
