//! Provider-side report hub.
//!
//! [`ReportHub`] is the [`ReportSink`] the provider publishes into. It keeps
//! the latest metric and alert states under a monotonically increasing
//! `mdib_version` and a bounded log of reports that consumers poll by
//! sequence number:
//!
//! - a metric report when at least one axis value changed,
//! - an episodic alert report when at least one condition or signal changed,
//! - an episodic context report when a patient or workflow context changed,
//! - an operation-invoked report for every transaction state change.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::alert::{AlertBand, AlertState, SignalPresence};
use crate::device::{Axis, ContextKind, ContextState};
use crate::publish::{CommitReceipt, PublishError, ReportSink, UpdateAccess};
use crate::transaction::{InvocationState, Transaction, TransactionListener};

/// Default number of reports kept in the log.
pub const REPORT_LOG_CAPACITY: usize = 256;

/// Published value of one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricState {
    /// Descriptor handle.
    #[schema(example = "height.metric")]
    pub handle: String,
    /// Axis.
    pub axis: Axis,
    /// Current value.
    #[schema(example = 80.0)]
    pub value: f64,
    /// Unit of the value.
    #[schema(example = "cm")]
    pub unit: String,
}

/// Published limit alert condition of one axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlertConditionState {
    /// Descriptor handle.
    #[schema(example = "height.alert_condition")]
    pub handle: String,
    /// Axis.
    pub axis: Axis,
    /// Whether the condition is present.
    pub presence: bool,
    /// Which limit is close, if present.
    pub band: Option<AlertBand>,
}

/// Published alert signal of one axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlertSignalState {
    /// Descriptor handle.
    #[schema(example = "height.alert_signal")]
    pub handle: String,
    /// Axis.
    pub axis: Axis,
    /// Signal presence.
    pub presence: SignalPresence,
}

/// Published state of one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContextReportState {
    /// Descriptor handle.
    #[schema(example = "context.patient")]
    pub handle: String,
    /// Which context.
    pub kind: ContextKind,
    /// Association and identification.
    #[serde(flatten)]
    pub state: ContextState,
}

/// Payload of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportBody {
    /// Numeric metric values changed.
    Metric {
        /// Changed metrics.
        metrics: Vec<MetricState>,
    },
    /// Alert conditions or signals changed.
    EpisodicAlert {
        /// Changed conditions.
        conditions: Vec<AlertConditionState>,
        /// Changed signals.
        signals: Vec<AlertSignalState>,
    },
    /// Context associations changed.
    EpisodicContext {
        /// Changed contexts.
        contexts: Vec<ContextReportState>,
    },
    /// An operation moved to a new invocation state.
    OperationInvoked {
        /// Transaction id.
        transaction_id: Uuid,
        /// Operation handle.
        operation_handle: String,
        /// New state.
        invocation_state: InvocationState,
        /// Failure reason for `fail`.
        error: Option<String>,
    },
}

/// One entry of the report log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    /// Position in the log; strictly increasing.
    pub sequence: u64,
    /// State version the report belongs to.
    pub mdib_version: u64,
    /// When the report was emitted.
    pub emitted_at_utc: DateTime<Utc>,
    /// Payload.
    #[serde(flatten)]
    pub body: ReportBody,
}

/// Latest published state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MdibSnapshot {
    /// State version.
    pub mdib_version: u64,
    /// Whether the hub is accepting updates.
    pub running: bool,
    /// Sequence number of the newest report.
    pub latest_sequence: u64,
    /// Metric states.
    pub metrics: Vec<MetricState>,
    /// Alert condition states.
    pub alert_conditions: Vec<AlertConditionState>,
    /// Alert signal states.
    pub alert_signals: Vec<AlertSignalState>,
    /// Context states.
    pub contexts: Vec<ContextReportState>,
}

#[derive(Debug, Default)]
struct HubInner {
    running: bool,
    mdib_version: u64,
    next_sequence: u64,
    metrics: BTreeMap<Axis, f64>,
    conditions: BTreeMap<Axis, AlertState>,
    signals: BTreeMap<Axis, SignalPresence>,
    contexts: BTreeMap<ContextKind, ContextState>,
    log: VecDeque<Report>,
}

impl HubInner {
    fn push(&mut self, body: ReportBody, capacity: usize) {
        self.next_sequence += 1;
        if self.log.len() == capacity {
            self.log.pop_front();
        }
        self.log.push_back(Report {
            sequence: self.next_sequence,
            mdib_version: self.mdib_version,
            emitted_at_utc: Utc::now(),
            body,
        });
    }
}

/// Versioned state store and report log.
#[derive(Debug)]
pub struct ReportHub {
    inner: Mutex<HubInner>,
    capacity: usize,
}

impl Default for ReportHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportHub {
    /// Creates a stopped hub with [`REPORT_LOG_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(REPORT_LOG_CAPACITY)
    }

    /// Creates a stopped hub keeping at most `capacity` reports.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HubInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Starts accepting commits.
    pub fn start(&self) {
        self.inner.lock().running = true;
    }

    /// Stops accepting commits.
    pub fn stop(&self) {
        self.inner.lock().running = false;
    }

    /// Returns `true` while commits are accepted.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Current state version.
    #[must_use]
    pub fn mdib_version(&self) -> u64 {
        self.inner.lock().mdib_version
    }

    /// Reports with a sequence number greater than `after`, oldest first.
    #[must_use]
    pub fn reports_after(&self, after: u64) -> Vec<Report> {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|report| report.sequence > after)
            .cloned()
            .collect()
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> MdibSnapshot {
        let inner = self.inner.lock();
        MdibSnapshot {
            mdib_version: inner.mdib_version,
            running: inner.running,
            latest_sequence: inner.next_sequence,
            metrics: inner
                .metrics
                .iter()
                .map(|(axis, value)| metric_state(*axis, *value))
                .collect(),
            alert_conditions: inner
                .conditions
                .iter()
                .map(|(axis, state)| condition_state(*axis, *state))
                .collect(),
            alert_signals: inner
                .signals
                .iter()
                .map(|(axis, presence)| signal_state(*axis, *presence))
                .collect(),
            contexts: inner
                .contexts
                .iter()
                .map(|(kind, state)| context_state(*kind, state.clone()))
                .collect(),
        }
    }
}

impl ReportSink for ReportHub {
    fn commit(&self, access: UpdateAccess) -> Result<CommitReceipt, PublishError> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Err(PublishError::NotRunning);
        }

        if let Some(bad) = access.metrics().iter().find(|m| !m.value.is_finite()) {
            return Err(PublishError::InvalidValue {
                handle: metric_handle(bad.axis),
                reason: format!("value {} is not finite", bad.value),
            });
        }

        let metrics: Vec<MetricState> = access
            .metrics()
            .iter()
            .filter(|m| inner.metrics.get(&m.axis) != Some(&m.value))
            .map(|m| metric_state(m.axis, m.value))
            .collect();
        let conditions: Vec<AlertConditionState> = access
            .alerts()
            .iter()
            .filter(|a| inner.conditions.get(&a.axis) != Some(&a.condition))
            .map(|a| condition_state(a.axis, a.condition))
            .collect();
        let signals: Vec<AlertSignalState> = access
            .alerts()
            .iter()
            .filter(|a| inner.signals.get(&a.axis) != Some(&a.signal))
            .map(|a| signal_state(a.axis, a.signal))
            .collect();

        let contexts: Vec<ContextReportState> = access
            .contexts()
            .iter()
            .filter(|c| inner.contexts.get(&c.kind) != Some(&c.state))
            .map(|c| context_state(c.kind, c.state.clone()))
            .collect();

        let receipt = CommitReceipt {
            mdib_version: inner.mdib_version,
            metrics_changed: metrics.len(),
            alerts_changed: conditions.len() + signals.len(),
            contexts_changed: contexts.len(),
        };
        if !receipt.changed() {
            return Ok(receipt);
        }

        inner.mdib_version += 1;
        for update in access.metrics() {
            inner.metrics.insert(update.axis, update.value);
        }
        for update in access.alerts() {
            inner.conditions.insert(update.axis, update.condition);
            inner.signals.insert(update.axis, update.signal);
        }
        for update in access.contexts() {
            inner.contexts.insert(update.kind, update.state.clone());
        }

        if !metrics.is_empty() {
            inner.push(ReportBody::Metric { metrics }, self.capacity);
        }
        if !conditions.is_empty() || !signals.is_empty() {
            inner.push(ReportBody::EpisodicAlert { conditions, signals }, self.capacity);
        }
        if !contexts.is_empty() {
            inner.push(ReportBody::EpisodicContext { contexts }, self.capacity);
        }

        debug!(mdib_version = inner.mdib_version, "Committed update");
        Ok(CommitReceipt {
            mdib_version: inner.mdib_version,
            ..receipt
        })
    }
}

impl TransactionListener for ReportHub {
    fn on_transition(&self, transaction: &Transaction) {
        let body = ReportBody::OperationInvoked {
            transaction_id: transaction.id,
            operation_handle: transaction.handle.clone(),
            invocation_state: transaction.state(),
            error: transaction.error().map(ToString::to_string),
        };
        self.inner.lock().push(body, self.capacity);
    }
}

fn metric_handle(axis: Axis) -> String {
    format!("{axis}.metric")
}

fn metric_state(axis: Axis, value: f64) -> MetricState {
    MetricState {
        handle: metric_handle(axis),
        axis,
        value,
        unit: axis.unit().to_string(),
    }
}

fn condition_state(axis: Axis, state: AlertState) -> AlertConditionState {
    AlertConditionState {
        handle: format!("{axis}.alert_condition"),
        axis,
        presence: state.presence,
        band: state.band,
    }
}

fn context_state(kind: ContextKind, state: ContextState) -> ContextReportState {
    ContextReportState {
        handle: format!("context.{}", kind.as_str()),
        kind,
        state,
    }
}

fn signal_state(axis: Axis, presence: SignalPresence) -> AlertSignalState {
    AlertSignalState {
        handle: format!("{axis}.alert_signal"),
        axis,
        presence,
    }
}
