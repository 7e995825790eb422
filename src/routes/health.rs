use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::config::LocationSource;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let source = match state.config.location_source {
        LocationSource::Relay => "relay",
        LocationSource::Replay => "replay",
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "location_source": source
    }))
}
