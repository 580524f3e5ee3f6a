//! # ortable-provider
//!
//! HTTP provider for the OR table demo.
//!
//! This binary provides:
//! - A virtual OR table driven through a REST operation API
//! - A background synchronizer publishing table state every interval
//! - A pollable report log for consumers
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package ortable-provider
//!
//! # With a config file
//! ./ortable-provider --config /etc/ortable/provider.toml
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ortable_core::ProviderConfig;
use ortable_provider::api::create_router;
use ortable_provider::logging;
use ortable_provider::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "ortable-provider")]
#[command(about = "OR table demo provider exposing a virtual table over HTTP")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, env = "ORTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Use production logging (JSON file + compact stdout)
    #[arg(long)]
    production: bool,

    /// Directory for production log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ProviderConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let log_dir = args.log_dir.unwrap_or_else(ortable_core::default_log_dir);
    logging::init(
        args.production || config.logging.production,
        &config.logging.level,
        &log_dir,
    )?;

    info!(
        endpoint_reference = %config.endpoint_reference,
        version = env!("CARGO_PKG_VERSION"),
        "Starting ortable-provider"
    );

    let listener = bind(&config).await?;
    let state = AppState::new(config);

    state.hub().start();
    let synchronizer = state.synchronizer().spawn();
    info!("Provider started");

    let app = create_router(state.clone());
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Server stopped accepting connections, cleaning up");
    let stats = synchronizer.stop().await;
    state.hub().stop();
    info!(
        ticks = stats.ticks,
        failures = stats.failures,
        "Provider shut down"
    );

    served.context("Server error")
}

/// Binds the configured address, falling back to all interfaces.
async fn bind(config: &ProviderConfig) -> anyhow::Result<TcpListener> {
    let port = config.network.port;
    let preferred = config
        .network
        .bind_address
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port));

    if let Ok(addr) = preferred {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "Listening");
                return Ok(listener);
            }
            Err(e) => warn!(%addr, error = %e, "Could not bind configured address"),
        }
    }

    let fallback = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    warn!(addr = %fallback, "Binding to default instead");
    TcpListener::bind(fallback)
        .await
        .with_context(|| format!("Failed to bind {fallback}"))
}

/// Waits for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
