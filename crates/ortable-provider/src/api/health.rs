//! Health check API endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use ortable_core::HealthResponse;

use crate::state::SharedState;

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
///
/// Returns the service version, the provider's endpoint reference and
/// whether reports are being published.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information. Use this endpoint \
        for liveness checks and monitoring.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let publishing = state.hub().is_running();

    Json(HealthResponse {
        status: if publishing { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoint_reference: state.config().endpoint_reference.clone(),
        publishing,
    })
}
