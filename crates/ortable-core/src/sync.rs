//! Periodic state synchronization.
//!
//! Once per interval the synchronizer snapshots the table, evaluates the
//! limit alerts and commits metrics, alerts and contexts to the
//! [`ReportSink`] as a single batch. A failed commit is logged and counted; the loop carries on
//! with the next tick. The loop stops cooperatively when
//! [`SynchronizerHandle::stop`] is called.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::alert::{signal_presence, ThresholdEvaluator};
use crate::device::{Axis, ContextKind, DeviceHandle};
use crate::publish::{CommitReceipt, PublishError, ReportSink};

/// Default tick interval.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(500);

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks whose commit failed.
    pub failures: u64,
}

/// Publishes table state to a sink on a fixed interval.
#[derive(Clone)]
pub struct PeriodicSynchronizer {
    device: DeviceHandle,
    sink: Arc<dyn ReportSink>,
    evaluator: ThresholdEvaluator,
    interval: Duration,
}

impl std::fmt::Debug for PeriodicSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicSynchronizer")
            .field("evaluator", &self.evaluator)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl PeriodicSynchronizer {
    /// Creates a synchronizer with the default interval and margin.
    #[must_use]
    pub fn new(device: DeviceHandle, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            device,
            sink,
            evaluator: ThresholdEvaluator::default(),
            interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Overrides the tick interval. A zero interval keeps the default.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    /// Overrides the alert evaluator.
    #[must_use]
    pub const fn with_evaluator(mut self, evaluator: ThresholdEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one synchronization step.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`PublishError`] if the commit was rejected.
    pub fn tick(&self) -> Result<CommitReceipt, PublishError> {
        let device = self.device.snapshot();
        let mut access = self.sink.make_update_access();

        for axis in Axis::ALL {
            access.update_metric(axis, device.pose.get(axis));
        }

        for (axis, condition) in self.evaluator.evaluate_pose(&device.pose) {
            let activation = device
                .alert_activation
                .iter()
                .find(|entry| entry.axis == axis)
                .map(|entry| entry.activation)
                .unwrap_or_default();
            access.update_alert(axis, condition, signal_presence(condition, activation));
        }

        for kind in ContextKind::ALL {
            let state = match kind {
                ContextKind::Patient => device.patient_context.clone(),
                ContextKind::Workflow => device.workflow_context.clone(),
            };
            access.update_context(kind, state);
        }

        self.sink.commit(access)
    }

    /// Starts the loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> SynchronizerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(stop_rx));
        SynchronizerHandle { stop_tx, join }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) -> SyncStats {
        let mut stats = SyncStats::default();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis(), "Synchronizer started");

        loop {
            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    stats.ticks += 1;
                    match self.tick() {
                        Ok(receipt) if receipt.changed() => debug!(
                            mdib_version = receipt.mdib_version,
                            metrics_changed = receipt.metrics_changed,
                            alerts_changed = receipt.alerts_changed,
                            contexts_changed = receipt.contexts_changed,
                            "Published table state"
                        ),
                        Ok(_) => {}
                        Err(e) => {
                            stats.failures += 1;
                            warn!(error = %e, tick = stats.ticks, "Synchronizer tick failed");
                        }
                    }
                }
            }
        }

        info!(ticks = stats.ticks, failures = stats.failures, "Synchronizer stopped");
        stats
    }
}

/// Handle to a running synchronizer loop.
#[derive(Debug)]
pub struct SynchronizerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<SyncStats>,
}

impl SynchronizerHandle {
    /// Returns `true` once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn stop(self) -> SyncStats {
        let _ = self.stop_tx.send(true);
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Synchronizer task did not exit cleanly");
                SyncStats::default()
            }
        }
    }
}
