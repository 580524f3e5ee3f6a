//! HTTP API routes and handlers.
//!
//! - `health` - Service health checks
//! - `device` - Provider description and state snapshot
//! - `operations` - Operation invocation
//! - `reports` - Report log polling
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod device;
pub mod error;
pub mod health;
pub mod openapi;
pub mod operations;
pub mod reports;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                                  - Health check
/// /api
/// ├── /description                         - Endpoint reference, model and device
/// ├── /mdib                                - Versioned state snapshot
/// ├── /operations                          - Supported operations
/// │   └── /{handle}/{service}              - Invoke an operation
/// ├── /reports?after=N                     - Report log
/// └── /openapi.json                        - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/description", get(device::get_description))
                .route("/mdib", get(device::get_mdib))
                .route("/reports", get(reports::get_reports))
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/operations", operations::router()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
