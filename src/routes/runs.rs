use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::types::run::{format_distance, RunRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/runs", get(list_runs))
        .route("/api/runs/:run_id", get(get_run))
}

#[derive(Debug, Serialize, Deserialize)]
struct RunSummary {
    id: Uuid,
    points: usize,
    distance_m: f64,
    distance_label: String,
    duration_seconds: u64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
}

impl From<&RunRecord> for RunSummary {
    fn from(record: &RunRecord) -> Self {
        Self {
            id: record.id,
            points: record.route.len(),
            distance_m: record.distance_m,
            distance_label: format_distance(record.distance_m),
            duration_seconds: record.duration_seconds(),
            started_at: record.started_at,
            ended_at: record.ended_at,
        }
    }
}

async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    Json(state.runs.list().iter().map(RunSummary::from).collect())
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, AppError> {
    let id = Uuid::parse_str(&run_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid run id: {}", run_id)))?;

    state
        .runs
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(run_id))
}
