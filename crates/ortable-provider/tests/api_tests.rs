//! Integration tests for the provider HTTP API.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ortable_core::{ProviderConfig, ReportSink};
use ortable_provider::api::create_router;
use ortable_provider::state::AppState;

fn test_app() -> (Router, AppState) {
    let state = AppState::new(ProviderConfig::default());
    state.hub().start();
    (create_router(state.clone()), state)
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(app: Router, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(Method::POST).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// System and description
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok() {
    let (app, _) = test_app();
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["publishing"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn description_carries_endpoint_reference() {
    let (app, _) = test_app();
    let json = body_json(get(app, "/api/description").await).await;
    assert_eq!(
        json["endpoint_reference"],
        "urn:uuid:sdcx-ORTableProvider-1234-12345"
    );
    assert_eq!(json["model"]["manufacturer"], "SurgiTAIX");
    assert_eq!(json["device"]["firmware_version"], "1.3.0");
}

#[tokio::test]
async fn operations_lists_every_handle() {
    let (app, _) = test_app();
    let json = body_json(get(app, "/api/operations").await).await;
    let operations = json["operations"].as_array().unwrap();
    assert_eq!(operations.len(), 16);
    assert!(operations
        .iter()
        .any(|op| op["handle"] == "position.select" && op["kind"] == "set-string"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = test_app();
    let response = get(app, "/api/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/operations/{handle}/set-string"].is_object());
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn activate_finishes_and_moves_the_table() {
    let (app, state) = test_app();
    let response = post(app, "/api/operations/height.increase/activate", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["invocation_state"], "fin");
    assert_eq!(json["history"], json!(["entry", "wait", "start", "fin"]));
    assert!((state.device().read().pose().height - 81.0).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_handle_is_not_found_and_leaves_table_unchanged() {
    let (app, state) = test_app();
    let before = state.device().snapshot();

    let response = post(app, "/api/operations/height.wiggle/activate", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported_operation");
    assert_eq!(json["details"]["handle"], "height.wiggle");

    assert_eq!(state.device().snapshot(), before);
    assert!(state.hub().reports_after(0).is_empty());
}

#[tokio::test]
async fn select_and_apply_beach_chair() {
    let (app, state) = test_app();

    let response = post(
        app.clone(),
        "/api/operations/position.select/set-string",
        Some(json!({ "value": "beach_chair" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post(app, "/api/operations/position.apply/activate", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let pose = state.device().read().pose();
    assert!((pose.height - 80.0).abs() < 1e-9);
    assert!((pose.backplate - 45.0).abs() < 1e-9);
}

#[tokio::test]
async fn bad_set_string_is_rejected_without_change() {
    let (app, state) = test_app();
    let before = state.device().snapshot();

    let response = post(
        app,
        "/api/operations/position.select/set-string",
        Some(json!({ "value": "Sofa" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_value");
    assert_eq!(state.device().snapshot(), before);
}

#[tokio::test]
async fn set_value_is_always_denied() {
    let (app, _) = test_app();
    let response = post(
        app,
        "/api/operations/height.increase/set-value",
        Some(json!({ "value": 100.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn set_context_and_alert_state() {
    let (app, state) = test_app();

    let response = post(
        app.clone(),
        "/api/operations/context.patient/set-context",
        Some(json!({ "association": "associated", "identification": "PAT-0042" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post(
        app.clone(),
        "/api/operations/context.workflow/set-context",
        Some(json!({ "association": "associated" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(
        app,
        "/api/operations/tilt.alert/set-alert-state",
        Some(json!({ "activation": "paused" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot = state.device().snapshot();
    assert_eq!(
        snapshot.patient_context.identification.as_deref(),
        Some("PAT-0042")
    );
    assert_eq!(
        snapshot.workflow_context,
        ortable_core::ContextState::default()
    );
}

async fn invocation_states(app: Router) -> Vec<String> {
    let json = body_json(get(app, "/api/reports?after=0").await).await;
    json["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["invocation_state"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn unknown_alert_activation_fails_the_transaction() {
    let (app, state) = test_app();

    let response = post(
        app.clone(),
        "/api/operations/height.alert/set-alert-state",
        Some(json!({ "activation": "latched" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_value");
    assert_eq!(json["details"]["handle"], "height.alert");

    assert_eq!(invocation_states(app).await, ["entry", "fail"]);
    assert_eq!(
        state.device().read().alert_activation(ortable_core::Axis::Height),
        ortable_core::AlertActivation::On
    );
}

#[tokio::test]
async fn malformed_body_fails_the_transaction_with_json_error() {
    let (app, state) = test_app();
    let before = state.device().snapshot();

    let response = post(
        app.clone(),
        "/api/operations/position.select/set-string",
        Some(json!({ "value": 5 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_value");
    assert!(json["message"].as_str().unwrap().contains("position.select"));

    let response = post(
        app.clone(),
        "/api/operations/context.patient/set-context",
        Some(json!({ "association": "maybe" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_value");

    assert_eq!(invocation_states(app).await, ["entry", "fail", "entry", "fail"]);
    assert_eq!(state.device().snapshot(), before);
}

#[tokio::test]
async fn missing_body_on_set_service_fails_the_transaction() {
    let (app, _) = test_app();
    let response = post(app.clone(), "/api/operations/position.select/set-string", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_value");
    assert_eq!(invocation_states(app).await, ["entry", "fail"]);
}

#[tokio::test]
async fn unknown_handle_is_not_found_whatever_the_body() {
    let (app, _) = test_app();

    for (uri, body) in [
        ("/api/operations/table.explode/set-alert-state", json!({ "activation": 1 })),
        ("/api/operations/table.explode/set-string", json!({})),
        ("/api/operations/height.increase/set-value", json!({ "value": "high" })),
    ] {
        let response = post(app.clone(), uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_json(response).await["error"], "unsupported_operation");
    }

    assert!(invocation_states(app).await.is_empty());
}

// ---------------------------------------------------------------------------
// Reports and state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn operation_reports_are_polled_in_order() {
    let (app, _) = test_app();
    post(app.clone(), "/api/operations/trend.increase/activate", None).await;

    let json = body_json(get(app.clone(), "/api/reports?after=0").await).await;
    let reports = json["reports"].as_array().unwrap();
    let states: Vec<&str> = reports
        .iter()
        .map(|r| r["invocation_state"].as_str().unwrap())
        .collect();
    assert_eq!(states, ["entry", "wait", "start", "fin"]);
    assert!(reports.iter().all(|r| r["type"] == "operation_invoked"));
    assert_eq!(json["latest_sequence"], 4);

    let json = body_json(get(app, "/api/reports?after=4").await).await;
    assert!(json["reports"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn synchronizer_tick_shows_up_in_mdib_and_reports() {
    let (app, state) = test_app();
    post(app.clone(), "/api/operations/backplate.increase/activate", None).await;

    let receipt = state.synchronizer().tick().unwrap();
    assert_eq!(receipt.mdib_version, 1);

    let json = body_json(get(app.clone(), "/api/mdib").await).await;
    assert_eq!(json["mdib"]["mdib_version"], 1);
    let backplate = json["mdib"]["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["axis"] == "backplate")
        .cloned()
        .unwrap();
    assert!((backplate["value"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    assert_eq!(json["device"]["predefined_position"], "NullLevel");

    let json = body_json(get(app, "/api/reports?after=4").await).await;
    let types: Vec<&str> = json["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["metric", "episodic_alert", "episodic_context"]);
}

#[tokio::test]
async fn stopped_hub_rejects_commits() {
    let (_, state) = test_app();
    state.hub().stop();
    let access = state.hub().make_update_access();
    assert!(state.hub().commit(access).is_err());
}
