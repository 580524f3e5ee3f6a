//! Operation dispatch.
//!
//! The dispatcher is the only writer of the [`VirtualDevice`]. It resolves an
//! operation handle to a target, validates the request, and runs the change
//! inside a [`Transaction`]:
//!
//! ```text
//! unknown handle / wrong kind   -> Unsupported, no transaction
//! malformed value               -> Entry -> Fail, InvalidValue, device untouched
//! accepted                      -> Entry -> Wait -> Start -> (mutate) -> Fin
//! ```
//!
//! Set-value requests are denied for every handle.
//!
//! [`VirtualDevice`]: crate::device::VirtualDevice

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::device::{
    AlertActivation, Axis, ContextAssociation, ContextKind, ContextState, DeviceHandle, Direction,
    PredefinedPosition, VirtualDevice,
};
use crate::transaction::{
    InvocationState, OperationKind, Transaction, TransactionError, TransactionListener,
};

/// Handle of the apply-predefined-position activate.
pub const APPLY_POSITION_HANDLE: &str = "position.apply";

/// Handle of the select-predefined-position set-string.
pub const SELECT_POSITION_HANDLE: &str = "position.select";

/// Maximum accepted length of a context identification.
pub const MAX_IDENTIFICATION_LENGTH: usize = 256;

/// An inbound operation request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    /// Parameterless trigger.
    Activate {
        /// Operation handle.
        handle: String,
    },
    /// String write.
    SetString {
        /// Operation handle.
        handle: String,
        /// Requested value.
        value: String,
    },
    /// Numeric write.
    SetValue {
        /// Operation handle.
        handle: String,
        /// Requested value.
        value: f64,
    },
    /// Context association change.
    SetContext {
        /// Operation handle.
        handle: String,
        /// Requested association.
        association: ContextAssociation,
        /// Identification, required when associating.
        identification: Option<String>,
    },
    /// Alert-signal activation change.
    SetAlertState {
        /// Operation handle.
        handle: String,
        /// Requested activation, parsed during validation.
        activation: String,
    },
    /// A request whose body could not be decoded.
    ///
    /// It still resolves its handle, so an unknown handle reports as
    /// unsupported and a known one fails its transaction with `reason`.
    Undecoded {
        /// Operation handle.
        handle: String,
        /// Set service the body was meant for.
        kind: OperationKind,
        /// Why decoding failed.
        reason: String,
    },
}

impl OperationRequest {
    /// Convenience constructor for an activate.
    #[must_use]
    pub fn activate(handle: impl Into<String>) -> Self {
        Self::Activate {
            handle: handle.into(),
        }
    }

    /// Convenience constructor for a set-string.
    #[must_use]
    pub fn set_string(handle: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SetString {
            handle: handle.into(),
            value: value.into(),
        }
    }

    /// Handle the request targets.
    #[must_use]
    pub fn handle(&self) -> &str {
        match self {
            Self::Activate { handle }
            | Self::SetString { handle, .. }
            | Self::SetValue { handle, .. }
            | Self::SetContext { handle, .. }
            | Self::SetAlertState { handle, .. }
            | Self::Undecoded { handle, .. } => handle,
        }
    }

    /// Set service kind of the request.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Activate { .. } => OperationKind::Activate,
            Self::SetString { .. } => OperationKind::SetString,
            Self::SetValue { .. } => OperationKind::SetValue,
            Self::SetContext { .. } => OperationKind::SetContext,
            Self::SetAlertState { .. } => OperationKind::SetAlertState,
            Self::Undecoded { kind, .. } => *kind,
        }
    }
}

/// Errors returned by [`OperationDispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The handle is unknown, or does not accept this kind of request.
    #[error("unsupported operation: {kind} on '{handle}'")]
    Unsupported {
        /// Requested handle.
        handle: String,
        /// Requested kind.
        kind: OperationKind,
    },

    /// The request value could not be applied.
    #[error("invalid value for '{handle}': {reason}")]
    InvalidValue {
        /// Requested handle.
        handle: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The state machine refused a transition.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// What a handle operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Adjust(Axis, Direction),
    ApplyPosition,
    SelectPosition,
    Context(ContextKind),
    AlertSignal(Axis),
}

impl Target {
    fn resolve(handle: &str) -> Option<Self> {
        match handle {
            APPLY_POSITION_HANDLE => return Some(Self::ApplyPosition),
            SELECT_POSITION_HANDLE => return Some(Self::SelectPosition),
            "context.patient" => return Some(Self::Context(ContextKind::Patient)),
            "context.workflow" => return Some(Self::Context(ContextKind::Workflow)),
            _ => {}
        }

        let (prefix, suffix) = handle.split_once('.')?;
        let axis = Axis::from_name(prefix)?;
        match suffix {
            "increase" => Some(Self::Adjust(axis, Direction::Increase)),
            "decrease" => Some(Self::Adjust(axis, Direction::Decrease)),
            "alert" => Some(Self::AlertSignal(axis)),
            _ => None,
        }
    }

    const fn kind(self) -> OperationKind {
        match self {
            Self::Adjust(..) | Self::ApplyPosition => OperationKind::Activate,
            Self::SelectPosition => OperationKind::SetString,
            Self::Context(_) => OperationKind::SetContext,
            Self::AlertSignal(_) => OperationKind::SetAlertState,
        }
    }

    fn handle(self) -> String {
        match self {
            Self::Adjust(axis, direction) => format!("{axis}.{}", direction.as_str()),
            Self::ApplyPosition => APPLY_POSITION_HANDLE.to_string(),
            Self::SelectPosition => SELECT_POSITION_HANDLE.to_string(),
            Self::Context(kind) => format!("context.{}", kind.as_str()),
            Self::AlertSignal(axis) => format!("{axis}.alert"),
        }
    }

    fn description(self) -> String {
        match self {
            Self::Adjust(axis, direction) => format!(
                "{} {axis} by {} {}",
                match direction {
                    Direction::Increase => "Increase",
                    Direction::Decrease => "Decrease",
                },
                axis.step(),
                axis.unit()
            ),
            Self::ApplyPosition => "Move all axes to the selected predefined position".to_string(),
            Self::SelectPosition => {
                "Select the predefined position ('NullLevel' or 'BeachChair')".to_string()
            }
            Self::Context(kind) => format!("Associate or disassociate the {} context", kind.as_str()),
            Self::AlertSignal(axis) => format!("Set the activation of the {axis} limit alert signal"),
        }
    }

    fn all() -> Vec<Self> {
        let mut targets = Vec::new();
        for axis in Axis::ALL {
            targets.push(Self::Adjust(axis, Direction::Increase));
            targets.push(Self::Adjust(axis, Direction::Decrease));
        }
        targets.push(Self::ApplyPosition);
        targets.push(Self::SelectPosition);
        targets.push(Self::Context(ContextKind::Patient));
        targets.push(Self::Context(ContextKind::Workflow));
        targets.extend(Axis::ALL.map(Self::AlertSignal));
        targets
    }
}

/// A validated change, ready to be applied under the write lock.
#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    Adjust(Axis, Direction),
    ApplyPosition,
    SelectPosition(PredefinedPosition),
    Context(ContextKind, ContextState),
    AlertSignal(Axis, AlertActivation),
}

impl Mutation {
    fn apply(self, device: &mut VirtualDevice) {
        match self {
            Self::Adjust(axis, direction) => {
                let value = device.adjust(axis, direction);
                debug!(%axis, value, "Axis adjusted");
            }
            Self::ApplyPosition => {
                let position = device.predefined_position();
                let pose = device.apply_predefined_position();
                info!(%position, ?pose, "Predefined position applied");
            }
            Self::SelectPosition(position) => {
                device.select_predefined_position(position);
                info!(%position, "Predefined position selected");
            }
            Self::Context(kind, state) => {
                info!(kind = kind.as_str(), association = ?state.association, "Context updated");
                device.set_context(kind, state);
            }
            Self::AlertSignal(axis, activation) => {
                info!(%axis, ?activation, "Alert signal activation changed");
                device.set_alert_activation(axis, activation);
            }
        }
    }
}

/// Description of a supported operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperationDescriptor {
    /// Operation handle.
    #[schema(example = "height.increase")]
    pub handle: String,
    /// Set service kind.
    pub kind: OperationKind,
    /// Human-readable description.
    pub description: String,
}

/// Executes operations against the table.
#[derive(Clone)]
pub struct OperationDispatcher {
    device: DeviceHandle,
    listener: Option<Arc<dyn TransactionListener>>,
}

impl std::fmt::Debug for OperationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDispatcher")
            .field("device", &self.device)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl OperationDispatcher {
    /// Creates a dispatcher for `device`.
    #[must_use]
    pub const fn new(device: DeviceHandle) -> Self {
        Self {
            device,
            listener: None,
        }
    }

    /// Attaches a listener notified of every transaction state change.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TransactionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The device this dispatcher writes to.
    #[must_use]
    pub const fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// All operations this dispatcher accepts.
    #[must_use]
    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        Target::all()
            .into_iter()
            .map(|target| OperationDescriptor {
                handle: target.handle(),
                kind: target.kind(),
                description: target.description(),
            })
            .collect()
    }

    /// Executes a request.
    ///
    /// # Errors
    ///
    /// - [`OperationError::Unsupported`] for unknown handles, kind mismatches
    ///   and every set-value request; no transaction is created.
    /// - [`OperationError::InvalidValue`] for malformed values or bodies; the
    ///   transaction ends in `Fail` and the device is unchanged.
    pub fn dispatch(&self, request: &OperationRequest) -> Result<Transaction, OperationError> {
        let handle = request.handle();
        let kind = request.kind();

        let Some(target) = Target::resolve(handle).filter(|target| target.kind() == kind) else {
            warn!(handle, %kind, "Rejected unsupported operation");
            return Err(OperationError::Unsupported {
                handle: handle.to_string(),
                kind,
            });
        };

        let mut transaction = Transaction::new(handle, kind);
        self.notify(&transaction);

        let mutation = match Self::validate(target, request) {
            Ok(mutation) => mutation,
            Err(reason) => {
                transaction.fail(reason.clone())?;
                self.notify(&transaction);
                warn!(handle, %reason, transaction_id = %transaction.id, "Rejected invalid value");
                return Err(OperationError::InvalidValue {
                    handle: handle.to_string(),
                    reason,
                });
            }
        };

        self.advance(&mut transaction, InvocationState::Wait)?;
        self.advance(&mut transaction, InvocationState::Start)?;
        mutation.apply(&mut self.device.write());
        self.advance(&mut transaction, InvocationState::Fin)?;

        debug!(handle, transaction_id = %transaction.id, "Operation finished");
        Ok(transaction)
    }

    fn validate(target: Target, request: &OperationRequest) -> Result<Mutation, String> {
        match (target, request) {
            (_, OperationRequest::Undecoded { reason, .. }) => Err(reason.clone()),
            (Target::Adjust(axis, direction), OperationRequest::Activate { .. }) => {
                Ok(Mutation::Adjust(axis, direction))
            }
            (Target::ApplyPosition, OperationRequest::Activate { .. }) => {
                Ok(Mutation::ApplyPosition)
            }
            (Target::SelectPosition, OperationRequest::SetString { value, .. }) => value
                .parse::<PredefinedPosition>()
                .map(Mutation::SelectPosition)
                .map_err(|e| e.to_string()),
            (
                Target::Context(kind),
                OperationRequest::SetContext {
                    association,
                    identification,
                    ..
                },
            ) => validate_context(*association, identification.as_deref())
                .map(|state| Mutation::Context(kind, state)),
            (Target::AlertSignal(axis), OperationRequest::SetAlertState { activation, .. }) => {
                activation
                    .parse::<AlertActivation>()
                    .map(|activation| Mutation::AlertSignal(axis, activation))
            }
            _ => Err(format!("{} is not accepted by '{}'", request.kind(), target.handle())),
        }
    }

    fn advance(
        &self,
        transaction: &mut Transaction,
        next: InvocationState,
    ) -> Result<(), TransactionError> {
        transaction.transition_to(next)?;
        self.notify(transaction);
        Ok(())
    }

    fn notify(&self, transaction: &Transaction) {
        if let Some(listener) = &self.listener {
            listener.on_transition(transaction);
        }
    }
}

fn validate_context(
    association: ContextAssociation,
    identification: Option<&str>,
) -> Result<ContextState, String> {
    match association {
        ContextAssociation::NotAssociated => Ok(ContextState::default()),
        ContextAssociation::Associated => {
            let id = identification.map(str::trim).unwrap_or_default();
            if id.is_empty() {
                return Err("identification is required to associate a context".to_string());
            }
            if id.chars().count() > MAX_IDENTIFICATION_LENGTH {
                return Err(format!(
                    "identification exceeds {MAX_IDENTIFICATION_LENGTH} characters"
                ));
            }
            Ok(ContextState {
                association,
                identification: Some(id.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::device::Pose;

    fn dispatcher() -> OperationDispatcher {
        OperationDispatcher::new(DeviceHandle::default())
    }

    fn activate(dispatcher: &OperationDispatcher, handle: &str) -> Transaction {
        dispatcher
            .dispatch(&OperationRequest::activate(handle))
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, InvocationState)>>,
    }

    impl TransactionListener for Recorder {
        fn on_transition(&self, transaction: &Transaction) {
            self.seen
                .lock()
                .push((transaction.handle.clone(), transaction.state()));
        }
    }

    #[test]
    fn test_activate_runs_full_sequence() {
        let dispatcher = dispatcher();
        let tx = activate(&dispatcher, "height.increase");
        assert_eq!(
            tx.history(),
            &[
                InvocationState::Entry,
                InvocationState::Wait,
                InvocationState::Start,
                InvocationState::Fin
            ]
        );
        assert!((dispatcher.device().read().value(Axis::Height) - 81.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_repeated_activates_stay_in_range() {
        let dispatcher = dispatcher();
        for axis in Axis::ALL {
            for direction in [Direction::Increase, Direction::Decrease] {
                let handle = format!("{axis}.{}", direction.as_str());
                for _ in 0..1_300 {
                    activate(&dispatcher, &handle);
                    let value = dispatcher.device().read().value(axis);
                    assert!(axis.limits().contains(value), "{handle} -> {value}");
                }
                let value = dispatcher.device().read().value(axis);
                let limits = axis.limits();
                let bound = match direction {
                    Direction::Increase => limits.max,
                    Direction::Decrease => limits.min,
                };
                assert!((value - bound).abs() < 1e-9, "{handle} ended at {value}");
            }
        }
    }

    #[test]
    fn test_apply_null_level_from_any_state() {
        let dispatcher = dispatcher();
        for handle in ["height.increase", "trend.decrease", "tilt.increase", "backplate.increase"] {
            for _ in 0..7 {
                activate(&dispatcher, handle);
            }
        }
        activate(&dispatcher, APPLY_POSITION_HANDLE);
        assert_eq!(
            dispatcher.device().read().pose(),
            Pose {
                height: 80.0,
                trend: 0.0,
                tilt: 0.0,
                backplate: 0.0
            }
        );
    }

    #[test]
    fn test_apply_beach_chair() {
        let dispatcher = dispatcher();
        activate(&dispatcher, "height.decrease");
        dispatcher
            .dispatch(&OperationRequest::set_string(SELECT_POSITION_HANDLE, "BeachChair"))
            .unwrap();
        // Selecting does not move the table.
        assert!((dispatcher.device().read().value(Axis::Height) - 79.0).abs() < f64::EPSILON);

        activate(&dispatcher, APPLY_POSITION_HANDLE);
        assert_eq!(
            dispatcher.device().read().pose(),
            Pose {
                height: 80.0,
                trend: 0.0,
                tilt: 0.0,
                backplate: 45.0
            }
        );
    }

    #[test]
    fn test_unknown_handle_leaves_device_untouched() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());
        activate(&dispatcher, "tilt.increase");
        let before = dispatcher.device().snapshot();
        recorder.seen.lock().clear();

        let err = dispatcher
            .dispatch(&OperationRequest::activate("table.explode"))
            .unwrap_err();
        assert!(matches!(err, OperationError::Unsupported { .. }));
        assert_eq!(dispatcher.device().snapshot(), before);
        assert!(recorder.seen.lock().is_empty(), "no transaction may start");
    }

    #[test]
    fn test_kind_mismatch_is_unsupported() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(&OperationRequest::set_string("height.increase", "1"))
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::Unsupported {
                handle: "height.increase".into(),
                kind: OperationKind::SetString
            }
        );
        let err = dispatcher
            .dispatch(&OperationRequest::activate(SELECT_POSITION_HANDLE))
            .unwrap_err();
        assert!(matches!(err, OperationError::Unsupported { .. }));
    }

    #[test]
    fn test_set_value_is_denied() {
        let dispatcher = dispatcher();
        let before = dispatcher.device().snapshot();
        let err = dispatcher
            .dispatch(&OperationRequest::SetValue {
                handle: "height.increase".into(),
                value: 100.0,
            })
            .unwrap_err();
        assert!(matches!(err, OperationError::Unsupported { .. }));
        assert_eq!(dispatcher.device().snapshot(), before);
    }

    #[test]
    fn test_invalid_position_fails_transaction() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());
        let before = dispatcher.device().snapshot();

        let err = dispatcher
            .dispatch(&OperationRequest::set_string(SELECT_POSITION_HANDLE, "Lithotomy"))
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
        assert_eq!(dispatcher.device().snapshot(), before);

        let states: Vec<_> = recorder.seen.lock().iter().map(|(_, s)| *s).collect();
        assert_eq!(states, vec![InvocationState::Entry, InvocationState::Fail]);
    }

    #[test]
    fn test_listener_sees_every_transition() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());
        activate(&dispatcher, "backplate.decrease");
        let states: Vec<_> = recorder.seen.lock().iter().map(|(_, s)| *s).collect();
        assert_eq!(
            states,
            vec![
                InvocationState::Entry,
                InvocationState::Wait,
                InvocationState::Start,
                InvocationState::Fin
            ]
        );
    }

    #[test]
    fn test_context_association() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(&OperationRequest::SetContext {
                handle: "context.patient".into(),
                association: ContextAssociation::Associated,
                identification: Some("  PAT-0042 ".into()),
            })
            .unwrap();
        let device = dispatcher.device().snapshot();
        assert_eq!(device.patient_context.association, ContextAssociation::Associated);
        assert_eq!(device.patient_context.identification.as_deref(), Some("PAT-0042"));

        dispatcher
            .dispatch(&OperationRequest::SetContext {
                handle: "context.patient".into(),
                association: ContextAssociation::NotAssociated,
                identification: None,
            })
            .unwrap();
        assert_eq!(dispatcher.device().snapshot().patient_context, ContextState::default());
    }

    #[test]
    fn test_context_association_requires_identification() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(&OperationRequest::SetContext {
                handle: "context.workflow".into(),
                association: ContextAssociation::Associated,
                identification: Some("   ".into()),
            })
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
    }

    #[test]
    fn test_alert_signal_activation() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(&OperationRequest::SetAlertState {
                handle: "trend.alert".into(),
                activation: "psd".into(),
            })
            .unwrap();
        assert_eq!(
            dispatcher.device().read().alert_activation(Axis::Trend),
            AlertActivation::Paused
        );
        assert_eq!(
            dispatcher.device().read().alert_activation(Axis::Tilt),
            AlertActivation::On
        );
    }

    #[test]
    fn test_unknown_alert_activation_fails_transaction() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());

        let err = dispatcher
            .dispatch(&OperationRequest::SetAlertState {
                handle: "height.alert".into(),
                activation: "latched".into(),
            })
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
        assert_eq!(
            dispatcher.device().read().alert_activation(Axis::Height),
            AlertActivation::On
        );

        let states: Vec<_> = recorder.seen.lock().iter().map(|(_, s)| *s).collect();
        assert_eq!(states, vec![InvocationState::Entry, InvocationState::Fail]);
    }

    #[test]
    fn test_identification_limit_counts_characters() {
        let dispatcher = dispatcher();
        let at_limit = "é".repeat(MAX_IDENTIFICATION_LENGTH);
        assert!(at_limit.len() > MAX_IDENTIFICATION_LENGTH);

        dispatcher
            .dispatch(&OperationRequest::SetContext {
                handle: "context.patient".into(),
                association: ContextAssociation::Associated,
                identification: Some(at_limit.clone()),
            })
            .unwrap();
        assert_eq!(
            dispatcher.device().snapshot().patient_context.identification,
            Some(at_limit)
        );

        let err = dispatcher
            .dispatch(&OperationRequest::SetContext {
                handle: "context.patient".into(),
                association: ContextAssociation::Associated,
                identification: Some("é".repeat(MAX_IDENTIFICATION_LENGTH + 1)),
            })
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidValue { .. }));
    }

    #[test]
    fn test_undecoded_body_fails_known_handle() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());
        let before = dispatcher.device().snapshot();

        let err = dispatcher
            .dispatch(&OperationRequest::Undecoded {
                handle: SELECT_POSITION_HANDLE.into(),
                kind: OperationKind::SetString,
                reason: "missing field `value`".into(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::InvalidValue {
                handle: SELECT_POSITION_HANDLE.into(),
                reason: "missing field `value`".into()
            }
        );
        assert_eq!(dispatcher.device().snapshot(), before);

        let states: Vec<_> = recorder.seen.lock().iter().map(|(_, s)| *s).collect();
        assert_eq!(states, vec![InvocationState::Entry, InvocationState::Fail]);
    }

    #[test]
    fn test_undecoded_body_on_unknown_handle_is_unsupported() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher().with_listener(recorder.clone());

        let err = dispatcher
            .dispatch(&OperationRequest::Undecoded {
                handle: "table.explode".into(),
                kind: OperationKind::SetAlertState,
                reason: "expected value".into(),
            })
            .unwrap_err();
        assert!(matches!(err, OperationError::Unsupported { .. }));
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn test_descriptors_resolve_back_to_their_kind() {
        let dispatcher = dispatcher();
        let descriptors = dispatcher.descriptors();
        assert_eq!(descriptors.len(), 16);
        for descriptor in descriptors {
            let target = Target::resolve(&descriptor.handle).unwrap();
            assert_eq!(target.kind(), descriptor.kind);
        }
    }
}
