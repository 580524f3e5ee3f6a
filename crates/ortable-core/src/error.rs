//! Unified error type for operation requests.
//!
//! [`OperationError`] and [`TransactionError`] convert into [`OrTableError`],
//! which carries the HTTP status and machine-readable code used by the
//! provider API.
//!
//! # Example
//!
//! ```rust
//! use ortable_core::error::{OrTableError, Result};
//!
//! fn require_handle(handle: &str) -> Result<()> {
//!     if handle.is_empty() {
//!         return Err(OrTableError::UnsupportedOperation {
//!             handle: handle.to_string(),
//!             kind: "activate".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(require_handle("").unwrap_err().http_status_code(), 404);
//! ```
//!
//! [`OperationError`]: crate::dispatcher::OperationError
//! [`TransactionError`]: crate::transaction::TransactionError

use thiserror::Error;

/// The unified error type for operation requests.
#[derive(Debug, Error)]
pub enum OrTableError {
    /// The operation handle is unknown or does not accept this request kind.
    #[error("Unsupported operation: {kind} on '{handle}'")]
    UnsupportedOperation {
        /// Requested handle.
        handle: String,
        /// Requested kind.
        kind: String,
    },

    /// The request value could not be applied. The table is unchanged.
    #[error("Invalid value for '{handle}': {reason}")]
    InvalidValue {
        /// Requested handle.
        handle: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transaction state machine refused a move.
    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// A specialized [`Result`] type for OR table operations.
pub type Result<T> = std::result::Result<T, OrTableError>;

impl OrTableError {
    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidValue { .. } => 400,

            // 404 Not Found - no such operation
            Self::UnsupportedOperation { .. } => 404,

            // 409 Conflict - state machine refused
            Self::Transaction(_) => 409,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedOperation { .. } => "unsupported_operation",
            Self::InvalidValue { .. } => "invalid_value",
            Self::Transaction(_) => "transaction_error",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::dispatcher::OperationError> for OrTableError {
    fn from(err: crate::dispatcher::OperationError) -> Self {
        use crate::dispatcher::OperationError;
        match err {
            OperationError::Unsupported { handle, kind } => Self::UnsupportedOperation {
                handle,
                kind: kind.to_string(),
            },
            OperationError::InvalidValue { handle, reason } => Self::InvalidValue { handle, reason },
            OperationError::Transaction(e) => e.into(),
        }
    }
}

impl From<crate::transaction::TransactionError> for OrTableError {
    fn from(err: crate::transaction::TransactionError) -> Self {
        Self::Transaction(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dispatcher::OperationError;
    use crate::transaction::{InvocationState, OperationKind, TransactionError};

    #[test]
    fn test_unsupported_operation_conversion() {
        let err: OrTableError = OperationError::Unsupported {
            handle: "height.wiggle".into(),
            kind: OperationKind::SetAlertState,
        }
        .into();
        assert_eq!(err.error_code(), "unsupported_operation");
        assert!(err.to_string().contains("height.wiggle"));
        assert!(err.to_string().contains("set-alert-state"));
    }

    #[test]
    fn test_transaction_error_maps_to_conflict() {
        let err: OrTableError = OperationError::Transaction(TransactionError::InvalidTransition {
            from: InvocationState::Fin,
            to: InvocationState::Wait,
        })
        .into();
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "transaction_error");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            OrTableError::InvalidValue {
                handle: "position.select".into(),
                reason: "bad".into()
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            OrTableError::UnsupportedOperation {
                handle: "x".into(),
                kind: "activate".into()
            }
            .http_status_code(),
            404
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OrTableError::InvalidValue {
                handle: String::new(),
                reason: String::new()
            }
            .error_code(),
            "invalid_value"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<OrTableError>();
        assert_sync::<OrTableError>();
    }
}
