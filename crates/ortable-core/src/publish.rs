//! Outbound publish interface.
//!
//! A publisher stages metric and alert updates in an [`UpdateAccess`] and
//! hands the whole batch to [`ReportSink::commit`]. A commit either applies
//! every staged update or none of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::alert::{AlertState, SignalPresence};
use crate::device::{Axis, ContextKind, ContextState};

/// Errors returned by a [`ReportSink`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The sink is not accepting updates (not started, or shut down).
    #[error("report sink is not running")]
    NotRunning,

    /// A staged value cannot be published.
    #[error("invalid update for '{handle}': {reason}")]
    InvalidValue {
        /// Descriptor handle of the rejected update.
        handle: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Sink-specific failure.
    #[error("commit failed: {0}")]
    CommitFailed(String),
}

/// Staged numeric metric update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricUpdate {
    /// Axis the metric belongs to.
    pub axis: Axis,
    /// New value.
    pub value: f64,
}

/// Staged alert update for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertUpdate {
    /// Axis the alert belongs to.
    pub axis: Axis,
    /// Limit alert condition.
    pub condition: AlertState,
    /// Resulting alert-signal presence.
    pub signal: SignalPresence,
}

/// Staged context update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUpdate {
    /// Which context.
    pub kind: ContextKind,
    /// New state.
    pub state: ContextState,
}

/// A batch of updates committed as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateAccess {
    metrics: Vec<MetricUpdate>,
    alerts: Vec<AlertUpdate>,
    contexts: Vec<ContextUpdate>,
}

impl UpdateAccess {
    /// Stages a metric value.
    pub fn update_metric(&mut self, axis: Axis, value: f64) -> &mut Self {
        self.metrics.push(MetricUpdate { axis, value });
        self
    }

    /// Stages an alert condition and signal.
    pub fn update_alert(
        &mut self,
        axis: Axis,
        condition: AlertState,
        signal: SignalPresence,
    ) -> &mut Self {
        self.alerts.push(AlertUpdate {
            axis,
            condition,
            signal,
        });
        self
    }

    /// Stages a context state.
    pub fn update_context(&mut self, kind: ContextKind, state: ContextState) -> &mut Self {
        self.contexts.push(ContextUpdate { kind, state });
        self
    }

    /// Staged metric updates.
    #[must_use]
    pub fn metrics(&self) -> &[MetricUpdate] {
        &self.metrics
    }

    /// Staged alert updates.
    #[must_use]
    pub fn alerts(&self) -> &[AlertUpdate] {
        &self.alerts
    }

    /// Staged context updates.
    #[must_use]
    pub fn contexts(&self) -> &[ContextUpdate] {
        &self.contexts
    }

    /// Returns `true` if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.alerts.is_empty() && self.contexts.is_empty()
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommitReceipt {
    /// State version after the commit.
    pub mdib_version: u64,
    /// Number of metrics whose value changed.
    pub metrics_changed: usize,
    /// Number of alert conditions or signals that changed.
    pub alerts_changed: usize,
    /// Number of contexts that changed.
    #[serde(default)]
    pub contexts_changed: usize,
}

impl CommitReceipt {
    /// Returns `true` if the commit changed any state.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.metrics_changed > 0 || self.alerts_changed > 0 || self.contexts_changed > 0
    }
}

/// Destination of periodic state updates.
pub trait ReportSink: Send + Sync {
    /// Opens a new, empty batch.
    fn make_update_access(&self) -> UpdateAccess {
        UpdateAccess::default()
    }

    /// Applies a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] if the batch was rejected; in that case no
    /// part of it has been applied.
    fn commit(&self, access: UpdateAccess) -> Result<CommitReceipt, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_access_chains() {
        let mut access = UpdateAccess::default();
        assert!(access.is_empty());
        access
            .update_metric(Axis::Height, 80.0)
            .update_alert(Axis::Height, AlertState::ABSENT, SignalPresence::Off);
        assert_eq!(access.metrics().len(), 1);
        assert_eq!(access.alerts().len(), 1);
        assert!(!access.is_empty());

        let mut contexts_only = UpdateAccess::default();
        contexts_only.update_context(ContextKind::Patient, ContextState::default());
        assert!(!contexts_only.is_empty());
        assert_eq!(contexts_only.contexts()[0].kind, ContextKind::Patient);
    }

    #[test]
    fn test_receipt_changed() {
        let receipt = CommitReceipt {
            mdib_version: 3,
            metrics_changed: 0,
            alerts_changed: 0,
            contexts_changed: 0,
        };
        assert!(!receipt.changed());
        assert!(CommitReceipt {
            alerts_changed: 1,
            ..receipt
        }
        .changed());
    }
}
