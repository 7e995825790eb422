use axum::{body::to_bytes, http::Request, response::Response, Router};
use runtrack_rs::{
    config::{Config, LocationSource},
    routes,
    state::AppState,
};
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use tower::ServiceExt;

fn app_with_state() -> (Router, AppState) {
    let config = Config {
        location_source: LocationSource::Relay,
        ..Config::default()
    };
    let state = AppState::new(config).expect("state");
    let app = Router::new()
        .merge(routes::run::router())
        .merge(routes::device::router())
        .with_state(state.clone());
    (app, state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method(method)
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json")
}

#[tokio::test]
async fn authorization_starts_undetermined_and_can_be_granted() {
    let (app, _) = app_with_state();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/device/authorization")
                .method("GET")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(json_body(response).await["status"], "not_determined");

    let response = send(
        &app,
        "PUT",
        "/api/device/authorization",
        json!({ "status": "when_in_use" }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "when_in_use");
}

#[tokio::test]
async fn fix_without_active_run_has_no_subscriber() {
    let (app, _) = app_with_state();
    let response = send(
        &app,
        "POST",
        "/api/device/location",
        json!({ "latitude": 52.52, "longitude": 13.405 }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert_eq!(json_body(response).await["outcome"], "no_subscriber");
}

#[tokio::test]
async fn out_of_range_fix_is_rejected() {
    let (app, _) = app_with_state();
    let response = send(
        &app,
        "POST",
        "/api/device/location",
        json!({ "latitude": 123.0, "longitude": 13.405 }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn device_error_is_surfaced_as_notice_and_run_continues() {
    let (app, state) = app_with_state();
    let mut notices = state.session.subscribe_notices();
    send(
        &app,
        "PUT",
        "/api/device/authorization",
        json!({ "status": "when_in_use" }),
    )
    .await;
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/api/run/start")
                .method("POST")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let response = send(
        &app,
        "POST",
        "/api/device/error",
        json!({ "message": "GPS signal lost" }),
    )
    .await;
    assert_eq!(json_body(response).await["delivered"], true);

    let notice = timeout(Duration::from_secs(1), notices.recv())
        .await
        .expect("notice in time")
        .expect("notice");
    let notice = serde_json::to_value(notice).expect("notice json");
    assert_eq!(notice["kind"], "provider_error");
    assert!(notice["message"]
        .as_str()
        .unwrap_or("")
        .contains("GPS signal lost"));

    let snapshot = state.session.current().await.expect("snapshot");
    assert_eq!(
        serde_json::to_value(snapshot.status).expect("status"),
        "running"
    );
}
