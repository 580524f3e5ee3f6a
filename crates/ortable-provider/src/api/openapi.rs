//! OpenAPI specification for the OR table provider API.
//!
//! Served at `/api/openapi.json` and written to disk by the `gen-openapi`
//! binary for client generation.

use axum::Json;
use utoipa::OpenApi;

use ortable_core::alert::{AlertBand, SignalPresence};
use ortable_core::config::{DeviceDescription, ModelDescription};
use ortable_core::device::{
    AlertActivation, Axis, AxisActivation, ContextAssociation, ContextKind, ContextState,
    DeviceSnapshot, Pose, PredefinedPosition,
};
use ortable_core::dispatcher::OperationDescriptor;
use ortable_core::reports::{
    AlertConditionState, AlertSignalState, ContextReportState, MdibSnapshot, MetricState, Report,
    ReportBody,
};
use ortable_core::transaction::{InvocationState, OperationKind};
use ortable_core::types::{
    DescriptionResponse, HealthResponse, MdibResponse, OperationResponse, OperationsResponse,
    ReportsResponse, SetAlertStateRequest, SetContextRequest, SetStringRequest, SetValueRequest,
};

use super::error::ErrorResponse;

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OR Table Provider API",
        version = "0.1.0",
        description = r#"
# OR Table Provider API

A demo provider exposing a virtual operating-room table.

## Overview

1. **Description**: endpoint reference, model and device description, used for discovery
2. **State**: the versioned snapshot of published metrics, alerts and contexts
3. **Operations**: activate, set-string, set-context and set-alert-state services
4. **Reports**: a pollable log of state changes and operation invocations

## Operations

Every accepted operation runs as a transaction through `entry`, `wait`, `start` and
`fin`. Unknown handles are rejected with 404 and never start a transaction. A
malformed value moves the transaction from `entry` to `fail` and answers 400; the
table is left unchanged.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local OR table provider")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "device", description = "Provider description and state snapshot"),
        (name = "operations", description = "Set services acting on the table"),
        (name = "reports", description = "Published state changes")
    ),
    paths(
        super::health::health_check,
        super::device::get_description,
        super::device::get_mdib,
        super::operations::list_operations,
        super::operations::activate,
        super::operations::set_string,
        super::operations::set_value,
        super::operations::set_context,
        super::operations::set_alert_state,
        super::reports::get_reports,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // System types
            HealthResponse,
            // Device types
            DescriptionResponse,
            ModelDescription,
            DeviceDescription,
            MdibResponse,
            MdibSnapshot,
            DeviceSnapshot,
            Pose,
            Axis,
            AxisActivation,
            PredefinedPosition,
            ContextKind,
            ContextAssociation,
            ContextState,
            AlertActivation,
            // Operation types
            OperationsResponse,
            OperationDescriptor,
            OperationResponse,
            OperationKind,
            InvocationState,
            SetStringRequest,
            SetValueRequest,
            SetContextRequest,
            SetAlertStateRequest,
            // Report types
            ReportsResponse,
            Report,
            ReportBody,
            MetricState,
            AlertConditionState,
            AlertSignalState,
            ContextReportState,
            AlertBand,
            SignalPresence,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "OR Table Provider API");
        assert!(spec.paths.paths.contains_key("/api/operations/{handle}/activate"));
        assert!(spec.paths.paths.contains_key("/api/reports"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"OR Table Provider API\""));
    }
}
