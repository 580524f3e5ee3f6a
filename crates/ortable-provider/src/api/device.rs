//! Provider description and state snapshot endpoints.
//!
//! `/api/description` answers discovery probes from consumers; `/api/mdib`
//! returns the last published state together with the live table.

use axum::extract::State;
use axum::Json;

use ortable_core::{DescriptionResponse, MdibResponse};

use crate::state::SharedState;

/// Get the provider description.
#[utoipa::path(
    get,
    path = "/api/description",
    tag = "device",
    operation_id = "getDescription",
    summary = "Get provider description",
    description = "Returns the endpoint reference plus the model and device description. \
        Consumers probe this endpoint during discovery and compare the endpoint reference \
        with the provider they are looking for.",
    responses(
        (status = 200, description = "Provider description", body = DescriptionResponse)
    )
)]
pub async fn get_description(State(state): State<SharedState>) -> Json<DescriptionResponse> {
    let config = state.config();
    Json(DescriptionResponse {
        endpoint_reference: config.endpoint_reference.clone(),
        discovery_port: config.network.discovery_port,
        model: config.model.clone(),
        device: config.device.clone(),
    })
}

/// Get the versioned state snapshot.
#[utoipa::path(
    get,
    path = "/api/mdib",
    tag = "device",
    operation_id = "getMdib",
    summary = "Get state snapshot",
    description = "Returns the last published metric, alert and context states with their \
        version, plus the live table state including the selected predefined position \
        and alert-signal activations.",
    responses(
        (status = 200, description = "State snapshot", body = MdibResponse)
    )
)]
pub async fn get_mdib(State(state): State<SharedState>) -> Json<MdibResponse> {
    Json(MdibResponse {
        mdib: state.hub().snapshot(),
        device: state.device().snapshot(),
    })
}
