use axum::{body::to_bytes, http::Request, response::Response, Router};
use runtrack_rs::{
    config::{Config, LocationSource},
    routes,
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = Config {
        location_source: LocationSource::Relay,
        ..Config::default()
    };
    let state = AppState::new(config).expect("state");
    Router::new()
        .merge(routes::run::router())
        .merge(routes::device::router())
        .merge(routes::runs::router())
        .with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(axum::body::Body::empty()).expect("request"),
    };
    app.clone().oneshot(request).await.expect("response")
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json")
}

#[tokio::test]
async fn stopped_run_is_listed_and_retrievable() {
    let app = app();
    send(
        &app,
        "PUT",
        "/api/device/authorization",
        Some(json!({ "status": "always" })),
    )
    .await;
    send(&app, "POST", "/api/run/start", None).await;
    for (longitude, second) in [(0.0, 0), (0.0001, 5), (0.0002, 10)] {
        send(
            &app,
            "POST",
            "/api/device/location",
            Some(json!({
                "latitude": 0.0,
                "longitude": longitude,
                "recorded_at": format!("2026-01-01T12:00:{second:02}Z")
            })),
        )
        .await;
    }
    send(&app, "POST", "/api/run/stop", None).await;

    let runs = json_body(send(&app, "GET", "/api/runs", None).await).await;
    let runs = runs.as_array().expect("run list");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["points"], 3);
    assert_eq!(runs[0]["distance_label"], "0.02 km");

    let id = runs[0]["id"].as_str().expect("run id");
    let response = send(&app, "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let run = json_body(response).await;
    assert_eq!(run["route"].as_array().map(Vec::len), Some(3));
    assert_eq!(run["route"][1]["longitude"], 0.0001);
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let app = app();
    let id = uuid::Uuid::new_v4();
    let response = send(&app, "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_run_id_is_rejected() {
    let app = app();
    let response = send(&app, "GET", "/api/runs/not-a-uuid", None).await;
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
