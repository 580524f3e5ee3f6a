//! Background report subscription.
//!
//! Polls the provider's report log every interval, remembering the highest
//! sequence seen, and logs each report as it arrives.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use ortable_core::{Report, ReportBody};

use crate::client::OrTableClient;

/// Counters reported when the poller stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Reports received.
    pub received: u64,
    /// Polls that failed.
    pub failures: u64,
    /// Highest sequence seen.
    pub last_sequence: u64,
}

/// Handle to a running poller.
#[derive(Debug)]
pub struct ReportPoller {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<PollStats>,
}

impl ReportPoller {
    /// Starts polling on the current tokio runtime.
    #[must_use]
    pub fn spawn(client: OrTableClient, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(run(client, interval, stop_rx));
        Self { stop_tx, join }
    }

    /// Signals the poller to stop and waits for it to exit.
    pub async fn stop(self) -> PollStats {
        let _ = self.stop_tx.send(true);
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Report poller did not exit cleanly");
                PollStats::default()
            }
        }
    }
}

async fn run(
    client: OrTableClient,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) -> PollStats {
    let mut stats = PollStats::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval_ms = interval.as_millis(), "Report poller started");

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match client.get_reports(stats.last_sequence).await {
                    Ok(batch) => {
                        for report in &batch.reports {
                            for line in describe(report) {
                                info!(sequence = report.sequence, mdib_version = report.mdib_version, "{line}");
                            }
                        }
                        stats.received += batch.reports.len() as u64;
                        stats.last_sequence = stats.last_sequence.max(batch.latest_sequence);
                    }
                    Err(e) => {
                        stats.failures += 1;
                        warn!(error = %e, "Polling reports failed");
                    }
                }
            }
        }
    }

    debug!(received = stats.received, failures = stats.failures, "Report poller stopped");
    stats
}

/// Human-readable lines for one report.
pub fn describe(report: &Report) -> Vec<String> {
    match &report.body {
        ReportBody::Metric { metrics } => metrics
            .iter()
            .map(|m| format!("Metric {}: {} {}", m.handle, m.value, m.unit))
            .collect(),
        ReportBody::EpisodicAlert {
            conditions,
            signals,
        } => conditions
            .iter()
            .map(|c| {
                let band = c
                    .band
                    .map_or_else(String::new, |band| format!(" ({band:?})"));
                format!("Alert condition {}: presence {}{band}", c.handle, c.presence)
            })
            .chain(
                signals
                    .iter()
                    .map(|s| format!("Alert signal {}: {:?}", s.handle, s.presence)),
            )
            .collect(),
        ReportBody::EpisodicContext { contexts } => contexts
            .iter()
            .map(|c| {
                format!(
                    "Context {}: {:?} {}",
                    c.handle,
                    c.state.association,
                    c.state.identification.as_deref().unwrap_or("-")
                )
            })
            .collect(),
        ReportBody::OperationInvoked {
            transaction_id,
            operation_handle,
            invocation_state,
            error,
        } => {
            let line = format!(
                "Operation {operation_handle} (transaction {transaction_id}): {invocation_state:?}"
            );
            vec![match error {
                Some(error) => format!("{line}, {error}"),
                None => line,
            }]
        }
    }
}
