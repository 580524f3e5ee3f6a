//! Logging initialization and configuration.
//!
//! - **Production**: JSON logs to daily rolling files + compact logs to stdout
//! - **Development**: Pretty logs to stdout with span events

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the configured default level.
pub const LOG_LEVEL_ENV: &str = "ORTABLE_LOG_LEVEL";

/// File name prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "ortable-provider.log";

/// Static guards to keep non-blocking writers alive for the whole program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize the logging system.
///
/// The filter comes from `RUST_LOG` if set, else `ORTABLE_LOG_LEVEL`, else
/// `default_level`.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(is_production: bool, default_level: &str, log_dir: &Path) -> anyhow::Result<()> {
    let env_filter = build_filter(default_level)?;

    if is_production {
        init_production(env_filter, log_dir)?;
    } else {
        init_development(env_filter);
    }

    Ok(())
}

fn build_filter(default_level: &str) -> anyhow::Result<EnvFilter> {
    let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_level.to_string());
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?)
}

fn init_production(env_filter: EnvFilter, log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // No ANSI colors for journald
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stdout)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    let _ = FILE_GUARD.set(file_guard);
    let _ = STDOUT_GUARD.set(stdout_guard);

    Ok(())
}

fn init_development(env_filter: EnvFilter) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}
