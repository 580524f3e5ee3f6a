//! Operation transactions and their invocation state machine.
//!
//! Every accepted operation runs as a [`Transaction`] that moves through
//! `Entry → Wait → Start → Fin`. A transaction may leave the happy path to
//! `Fail` from any non-terminal state, but it can never skip a state or go
//! back. `Fin` and `Fail` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Invocation state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Request received, not yet acknowledged.
    Entry,
    /// Acknowledged, waiting to be executed.
    Wait,
    /// Execution started.
    Start,
    /// Finished successfully.
    Fin,
    /// Failed.
    Fail,
}

impl InvocationState {
    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Entry, Self::Wait | Self::Fail)
                | (Self::Wait, Self::Start | Self::Fail)
                | (Self::Start, Self::Fin | Self::Fail)
        )
    }

    /// Returns `true` for `Fin` and `Fail`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fin | Self::Fail)
    }

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Wait => "wait",
            Self::Start => "start",
            Self::Fin => "fin",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of set service an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Parameterless trigger.
    Activate,
    /// Sets a string value.
    SetString,
    /// Sets a numeric value.
    SetValue,
    /// Associates or disassociates a context.
    SetContext,
    /// Changes an alert-signal activation.
    SetAlertState,
}

impl OperationKind {
    /// Kebab-case name, as used in the HTTP routes and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::SetString => "set-string",
            Self::SetValue => "set-value",
            Self::SetContext => "set-context",
            Self::SetAlertState => "set-alert-state",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The requested move is not in the transition table.
    #[error("invalid invocation state transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current state.
        from: InvocationState,
        /// Requested state.
        to: InvocationState,
    },
}

/// One operation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique transaction id.
    pub id: Uuid,
    /// Handle of the invoked operation.
    #[schema(example = "height.increase")]
    pub handle: String,
    /// Kind of the invoked operation.
    pub kind: OperationKind,
    /// When the request entered the dispatcher.
    pub created_at_utc: DateTime<Utc>,
    state: InvocationState,
    history: Vec<InvocationState>,
    error: Option<String>,
}

impl Transaction {
    /// Creates a transaction in `Entry`.
    #[must_use]
    pub fn new(handle: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            handle: handle.into(),
            kind,
            created_at_utc: Utc::now(),
            state: InvocationState::Entry,
            history: vec![InvocationState::Entry],
            error: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> InvocationState {
        self.state
    }

    /// Every state the transaction has been in, oldest first.
    #[must_use]
    pub fn history(&self) -> &[InvocationState] {
        &self.history
    }

    /// Failure reason, set when the transaction ended in `Fail`.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidTransition`] if the move is not in
    /// the transition table; the state is left unchanged.
    pub fn transition_to(&mut self, next: InvocationState) -> Result<(), TransactionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransactionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Fail` and records the reason.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidTransition`] if already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransactionError> {
        self.transition_to(InvocationState::Fail)?;
        self.error = Some(reason.into());
        Ok(())
    }
}

/// Observer notified after every state change of every transaction.
///
/// Called once for `Entry` when the transaction is created and once per
/// transition afterwards. Implementations must not block.
pub trait TransactionListener: Send + Sync {
    /// Called with the transaction in its new state.
    fn on_transition(&self, transaction: &Transaction);
}

#[cfg(test)]
mod tests {
    use super::*;

    use InvocationState::{Entry, Fail, Fin, Start, Wait};

    #[test]
    fn test_happy_path() {
        let mut tx = Transaction::new("height.increase", OperationKind::Activate);
        tx.transition_to(Wait).unwrap();
        tx.transition_to(Start).unwrap();
        tx.transition_to(Fin).unwrap();
        assert_eq!(tx.state(), Fin);
        assert_eq!(tx.history(), &[Entry, Wait, Start, Fin]);
        assert!(tx.error().is_none());
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut tx = Transaction::new("height.increase", OperationKind::Activate);
        let err = tx.transition_to(Start).unwrap_err();
        assert_eq!(err, TransactionError::InvalidTransition { from: Entry, to: Start });
        assert_eq!(tx.state(), Entry);

        tx.transition_to(Wait).unwrap();
        assert!(tx.transition_to(Fin).is_err());
        assert_eq!(tx.history(), &[Entry, Wait]);
    }

    #[test]
    fn test_regression_is_rejected() {
        let mut tx = Transaction::new("tilt.decrease", OperationKind::Activate);
        tx.transition_to(Wait).unwrap();
        tx.transition_to(Start).unwrap();
        assert!(tx.transition_to(Wait).is_err());
        assert!(tx.transition_to(Entry).is_err());
        assert!(tx.transition_to(Start).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for state in [Entry, Wait, Start, Fin, Fail] {
            assert!(!Fin.can_transition_to(state));
            assert!(!Fail.can_transition_to(state));
        }
        assert!(Fin.is_terminal());
        assert!(Fail.is_terminal());
        assert!(!Start.is_terminal());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut tx = Transaction::new("position.select", OperationKind::SetString);
        tx.fail("bad value").unwrap();
        assert_eq!(tx.state(), Fail);
        assert_eq!(tx.error(), Some("bad value"));
        assert!(tx.fail("again").is_err());
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = Transaction::new("a", OperationKind::Activate);
        let b = Transaction::new("a", OperationKind::Activate);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Fin).unwrap(), "\"fin\"");
    }

    #[test]
    fn test_kind_serializes_as_route_segment() {
        for kind in [
            OperationKind::Activate,
            OperationKind::SetString,
            OperationKind::SetValue,
            OperationKind::SetContext,
            OperationKind::SetAlertState,
        ] {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::from(kind.as_str())
            );
        }
        let kind: OperationKind = serde_json::from_str("\"set-alert-state\"").unwrap();
        assert_eq!(kind, OperationKind::SetAlertState);
    }
}
