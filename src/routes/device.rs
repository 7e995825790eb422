use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::provider::{Authorization, FixOutcome, LocationProvider};
use crate::state::AppState;
use crate::types::coordinate::LocationFix;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/device/authorization",
            get(get_authorization).put(set_authorization),
        )
        .route("/api/device/location", post(push_location))
        .route("/api/device/error", post(push_error))
}

#[derive(Serialize, Deserialize)]
struct AuthorizationBody {
    status: Authorization,
}

#[derive(Serialize, Deserialize)]
struct LocationResponse {
    outcome: FixOutcome,
}

#[derive(Serialize, Deserialize)]
struct ErrorReport {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    delivered: bool,
}

async fn get_authorization(
    State(state): State<AppState>,
) -> Result<Json<AuthorizationBody>, AppError> {
    let relay = state.relay()?;
    Ok(Json(AuthorizationBody {
        status: relay.authorization(),
    }))
}

async fn set_authorization(
    State(state): State<AppState>,
    Json(body): Json<AuthorizationBody>,
) -> Result<Json<AuthorizationBody>, AppError> {
    let relay = state.relay()?;
    relay.set_authorization(body.status);
    Ok(Json(AuthorizationBody {
        status: relay.authorization(),
    }))
}

async fn push_location(
    State(state): State<AppState>,
    Json(fix): Json<LocationFix>,
) -> Result<Json<LocationResponse>, AppError> {
    let relay = state.relay()?;
    if !fix.coordinate().is_valid() {
        return Err(AppError::BadRequest(format!(
            "Coordinate out of range: {}, {}",
            fix.latitude, fix.longitude
        )));
    }

    let outcome = relay.push_fix(&fix);
    tracing::debug!("Device fix {}, {} -> {:?}", fix.latitude, fix.longitude, outcome);
    Ok(Json(LocationResponse { outcome }))
}

async fn push_error(
    State(state): State<AppState>,
    Json(report): Json<ErrorReport>,
) -> Result<Json<ErrorResponse>, AppError> {
    let relay = state.relay()?;
    if report.message.trim().is_empty() {
        return Err(AppError::BadRequest("Error message is empty".to_string()));
    }

    let delivered = relay.push_error(&report.message);
    Ok(Json(ErrorResponse { delivered }))
}
