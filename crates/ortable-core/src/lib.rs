//! # ortable-core
//!
//! Core logic of the OR table demo provider and consumer.
//!
//! This crate provides:
//! - A virtual OR table with four clamped axes and predefined positions
//! - Operation dispatch through a transaction state machine
//! - Limit alert evaluation near each axis boundary
//! - A periodic synchronizer publishing table state to a report sink
//! - The provider's versioned report hub
//!
//! ## Architecture
//!
//! - [`device`] - Virtual table state and the shared [`DeviceHandle`]
//! - [`transaction`] - Invocation states and their transition table
//! - [`dispatcher`] - Operation handles, validation and execution
//! - [`alert`] - Threshold evaluation and alert-signal presence
//! - [`publish`] - Batched update interface consumed by report sinks
//! - [`reports`] - Versioned state store and report log
//! - [`sync`] - Background loop publishing the table every interval
//! - [`config`] - Layered provider configuration
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared API types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod alert;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod publish;
pub mod reports;
pub mod sync;
pub mod transaction;
pub mod types;

// Re-export primary types for convenience
pub use alert::{
    evaluate, signal_presence, AlertBand, AlertState, SignalPresence, ThresholdEvaluator,
    DEFAULT_ALERT_MARGIN,
};
pub use config::{
    default_config_path, default_log_dir, is_valid_endpoint_reference, ConfigError,
    ConfigResult, DeviceDescription, LoggingConfig, ModelDescription, NetworkConfig,
    ProviderConfig, SynchronizerConfig,
};
pub use device::{
    AlertActivation, Axis, AxisLimits, ContextAssociation, ContextKind, ContextState,
    DeviceHandle, DeviceSnapshot, Direction, Pose, PredefinedPosition, VirtualDevice,
};
pub use dispatcher::{
    OperationDescriptor, OperationDispatcher, OperationError, OperationRequest,
    APPLY_POSITION_HANDLE, SELECT_POSITION_HANDLE,
};
pub use error::{OrTableError, Result};
pub use publish::{CommitReceipt, PublishError, ReportSink, UpdateAccess};
pub use reports::{MdibSnapshot, Report, ReportBody, ReportHub};
pub use sync::{PeriodicSynchronizer, SynchronizerHandle, SyncStats, DEFAULT_SYNC_INTERVAL};
pub use transaction::{
    InvocationState, OperationKind, Transaction, TransactionError, TransactionListener,
};
pub use types::{
    DescriptionResponse, HealthResponse, MdibResponse, OperationResponse, OperationsResponse,
    ReportsResponse, SetAlertStateRequest, SetContextRequest, SetStringRequest, SetValueRequest,
};
