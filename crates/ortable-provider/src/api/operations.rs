//! Operation invocation endpoints.
//!
//! Each set service has its own route under `/api/operations/{handle}`. The
//! handler builds an [`OperationRequest`], runs it through the dispatcher
//! and returns the finished transaction. Unknown handles and kind
//! mismatches answer 404; malformed values and undecodable bodies answer
//! 400 after the transaction fails.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use ortable_core::{
    OperationKind, OperationRequest, OperationResponse, OperationsResponse, SetAlertStateRequest,
    SetContextRequest, SetStringRequest, SetValueRequest,
};

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the operations router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_operations))
        .route("/{handle}/activate", post(activate))
        .route("/{handle}/set-string", post(set_string))
        .route("/{handle}/set-value", post(set_value))
        .route("/{handle}/set-context", post(set_context))
        .route("/{handle}/set-alert-state", post(set_alert_state))
}

fn invoke(state: &SharedState, request: &OperationRequest) -> ApiResult<Json<OperationResponse>> {
    let transaction = state.dispatcher().dispatch(request).map_err(ApiError::from)?;
    info!(
        handle = %transaction.handle,
        kind = %transaction.kind,
        transaction_id = %transaction.id,
        state = %transaction.state(),
        "Operation invoked"
    );
    Ok(Json(OperationResponse::from(&transaction)))
}

/// Builds the request from a decoded body, or an undecoded request that
/// still goes through handle resolution.
fn decode<T>(
    handle: String,
    kind: OperationKind,
    payload: Result<Json<T>, JsonRejection>,
    build: impl FnOnce(String, T) -> OperationRequest,
) -> OperationRequest {
    match payload {
        Ok(Json(body)) => build(handle, body),
        Err(rejection) => OperationRequest::Undecoded {
            handle,
            kind,
            reason: rejection.body_text(),
        },
    }
}

/// List supported operations.
#[utoipa::path(
    get,
    path = "/api/operations",
    tag = "operations",
    operation_id = "listOperations",
    summary = "List supported operations",
    description = "Returns every operation handle the provider accepts with its set service \
        kind. Any other handle is rejected.",
    responses(
        (status = 200, description = "Supported operations", body = OperationsResponse)
    )
)]
pub async fn list_operations(State(state): State<SharedState>) -> Json<OperationsResponse> {
    Json(OperationsResponse {
        operations: state.dispatcher().descriptors(),
    })
}

/// Invoke an activate operation.
#[utoipa::path(
    post,
    path = "/api/operations/{handle}/activate",
    tag = "operations",
    operation_id = "activate",
    summary = "Invoke an activate operation",
    description = "Moves an axis one step (`height.increase`, `tilt.decrease`, ...) or applies \
        the selected predefined position (`position.apply`). Values are clamped to the axis \
        range.",
    params(
        ("handle" = String, Path, description = "Operation handle", example = "height.increase")
    ),
    responses(
        (status = 200, description = "Operation finished", body = OperationResponse),
        (status = 404, description = "Unsupported operation", body = ErrorResponse)
    )
)]
pub async fn activate(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<OperationResponse>> {
    invoke(&state, &OperationRequest::Activate { handle })
}

/// Invoke a set-string operation.
#[utoipa::path(
    post,
    path = "/api/operations/{handle}/set-string",
    tag = "operations",
    operation_id = "setString",
    summary = "Invoke a set-string operation",
    description = "Selects the predefined position applied by `position.apply`. Accepted \
        values are `NullLevel` and `BeachChair`, ignoring case, spaces, `_` and `-`.",
    params(
        ("handle" = String, Path, description = "Operation handle", example = "position.select")
    ),
    request_body = SetStringRequest,
    responses(
        (status = 200, description = "Operation finished", body = OperationResponse),
        (status = 400, description = "Value or body not recognized, table unchanged", body = ErrorResponse),
        (status = 404, description = "Unsupported operation", body = ErrorResponse)
    )
)]
pub async fn set_string(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    payload: Result<Json<SetStringRequest>, JsonRejection>,
) -> ApiResult<Json<OperationResponse>> {
    let request = decode(handle, OperationKind::SetString, payload, |handle, body| {
        OperationRequest::SetString {
            handle,
            value: body.value,
        }
    });
    invoke(&state, &request)
}

/// Invoke a set-value operation.
#[utoipa::path(
    post,
    path = "/api/operations/{handle}/set-value",
    tag = "operations",
    operation_id = "setValue",
    summary = "Invoke a set-value operation",
    description = "Numeric writes are not accepted for any handle; axes only move through \
        their activate operations. Always answers 404.",
    params(
        ("handle" = String, Path, description = "Operation handle", example = "height.metric")
    ),
    request_body = SetValueRequest,
    responses(
        (status = 404, description = "Unsupported operation", body = ErrorResponse)
    )
)]
pub async fn set_value(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    payload: Result<Json<SetValueRequest>, JsonRejection>,
) -> ApiResult<Json<OperationResponse>> {
    let request = decode(handle, OperationKind::SetValue, payload, |handle, body| {
        OperationRequest::SetValue {
            handle,
            value: body.value,
        }
    });
    invoke(&state, &request)
}

/// Invoke a set-context operation.
#[utoipa::path(
    post,
    path = "/api/operations/{handle}/set-context",
    tag = "operations",
    operation_id = "setContext",
    summary = "Invoke a set-context operation",
    description = "Associates or disassociates the patient (`context.patient`) or workflow \
        (`context.workflow`) context. Associating requires a non-empty identification.",
    params(
        ("handle" = String, Path, description = "Operation handle", example = "context.patient")
    ),
    request_body = SetContextRequest,
    responses(
        (status = 200, description = "Operation finished", body = OperationResponse),
        (status = 400, description = "Invalid identification or body", body = ErrorResponse),
        (status = 404, description = "Unsupported operation", body = ErrorResponse)
    )
)]
pub async fn set_context(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    payload: Result<Json<SetContextRequest>, JsonRejection>,
) -> ApiResult<Json<OperationResponse>> {
    let request = decode(handle, OperationKind::SetContext, payload, |handle, body| {
        OperationRequest::SetContext {
            handle,
            association: body.association,
            identification: body.identification,
        }
    });
    invoke(&state, &request)
}

/// Invoke a set-alert-state operation.
#[utoipa::path(
    post,
    path = "/api/operations/{handle}/set-alert-state",
    tag = "operations",
    operation_id = "setAlertState",
    summary = "Invoke a set-alert-state operation",
    description = "Sets the activation of an axis limit alert signal (`height.alert`, ...). \
        The signal is only present while the condition is present and the activation is `on`.",
    params(
        ("handle" = String, Path, description = "Operation handle", example = "tilt.alert")
    ),
    request_body = SetAlertStateRequest,
    responses(
        (status = 200, description = "Operation finished", body = OperationResponse),
        (status = 400, description = "Activation or body not recognized", body = ErrorResponse),
        (status = 404, description = "Unsupported operation", body = ErrorResponse)
    )
)]
pub async fn set_alert_state(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    payload: Result<Json<SetAlertStateRequest>, JsonRejection>,
) -> ApiResult<Json<OperationResponse>> {
    let request = decode(handle, OperationKind::SetAlertState, payload, |handle, body| {
        OperationRequest::SetAlertState {
            handle,
            activation: body.activation,
        }
    });
    invoke(&state, &request)
}
