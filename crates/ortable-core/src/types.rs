//! Shared API types and OpenAPI schemas.
//!
//! Request and response bodies of the provider HTTP API. The provider
//! serializes them and the consumer deserializes them, so both sides agree
//! on one definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{DeviceDescription, ModelDescription};
use crate::device::{ContextAssociation, DeviceSnapshot};
use crate::dispatcher::OperationDescriptor;
use crate::reports::{MdibSnapshot, Report};
use crate::transaction::{InvocationState, OperationKind, Transaction};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "endpoint_reference": "urn:uuid:sdcx-ORTableProvider-1234-12345",
    "publishing": true
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Endpoint reference of this provider.
    pub endpoint_reference: String,

    /// Whether the report hub accepts updates.
    pub publishing: bool,
}

/// Provider description, answered to discovery probes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DescriptionResponse {
    /// Endpoint reference of this provider.
    #[schema(example = "urn:uuid:sdcx-ORTableProvider-1234-12345")]
    pub endpoint_reference: String,

    /// Port advertised for discovery.
    #[schema(example = 5011)]
    pub discovery_port: u16,

    /// Model description.
    pub model: ModelDescription,

    /// Device description.
    pub device: DeviceDescription,
}

/// Versioned published state plus the live table state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MdibResponse {
    /// Last published state.
    pub mdib: MdibSnapshot,

    /// Live table state, including selection and alert activations.
    pub device: DeviceSnapshot,
}

/// Supported operations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationsResponse {
    /// One entry per accepted handle.
    pub operations: Vec<OperationDescriptor>,
}

/// Result of an invoked operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "transaction_id": "0191c1f2-7d3a-7cc2-8f3e-5d5b2f6e9a10",
    "handle": "height.increase",
    "kind": "activate",
    "invocation_state": "fin",
    "history": ["entry", "wait", "start", "fin"],
    "created_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct OperationResponse {
    /// Transaction id.
    pub transaction_id: Uuid,

    /// Invoked handle.
    #[schema(example = "height.increase")]
    pub handle: String,

    /// Set service kind.
    pub kind: OperationKind,

    /// Final invocation state.
    pub invocation_state: InvocationState,

    /// Every state the transaction went through.
    pub history: Vec<InvocationState>,

    /// When the request entered the dispatcher.
    pub created_at_utc: DateTime<Utc>,
}

impl From<&Transaction> for OperationResponse {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id,
            handle: transaction.handle.clone(),
            kind: transaction.kind,
            invocation_state: transaction.state(),
            history: transaction.history().to_vec(),
            created_at_utc: transaction.created_at_utc,
        }
    }
}

/// Body of a set-string request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "value": "BeachChair" }))]
pub struct SetStringRequest {
    /// Requested value.
    #[schema(example = "BeachChair")]
    pub value: String,
}

/// Body of a set-value request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetValueRequest {
    /// Requested value.
    #[schema(example = 100.0)]
    pub value: f64,
}

/// Body of a set-context request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "association": "associated", "identification": "PAT-0042" }))]
pub struct SetContextRequest {
    /// Requested association.
    pub association: ContextAssociation,

    /// Identification, required when associating.
    #[serde(default)]
    pub identification: Option<String>,
}

/// Body of a set-alert-state request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "activation": "off" }))]
pub struct SetAlertStateRequest {
    /// Requested activation: `on`, `off` or `paused` (`psd` is accepted).
    #[schema(example = "off")]
    pub activation: String,
}

/// Reports newer than the requested sequence number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportsResponse {
    /// Reports, oldest first.
    pub reports: Vec<Report>,

    /// Sequence number of the newest report in the log.
    #[schema(example = 42)]
    pub latest_sequence: u64,

    /// Current state version.
    #[schema(example = 17)]
    pub mdib_version: u64,
}
