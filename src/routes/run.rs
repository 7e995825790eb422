use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppError;
use crate::state::AppState;
use crate::types::run::{SessionSnapshot, Transition};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/run", get(current))
        .route("/api/run/start", post(start))
        .route("/api/run/stop", post(stop))
        .route("/api/run/toggle", post(toggle))
        .route("/api/run/events", get(events))
}

#[derive(Serialize, Deserialize)]
struct CommandResponse {
    transition: Transition,
    snapshot: SessionSnapshot,
}

async fn current(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.current().await?))
}

async fn start(State(state): State<AppState>) -> Result<Json<CommandResponse>, AppError> {
    let transition = state.session.start().await?;
    respond(&state, transition).await
}

async fn stop(State(state): State<AppState>) -> Result<Json<CommandResponse>, AppError> {
    let transition = state.session.stop().await?;
    respond(&state, transition).await
}

async fn toggle(State(state): State<AppState>) -> Result<Json<CommandResponse>, AppError> {
    let transition = state.session.toggle().await?;
    respond(&state, transition).await
}

async fn respond(state: &AppState, transition: Transition) -> Result<Json<CommandResponse>, AppError> {
    let snapshot = state.session.current().await?;
    tracing::info!(
        "Run command -> {:?} ({:?}, {})",
        transition,
        snapshot.status,
        snapshot.distance_label
    );
    Ok(Json(CommandResponse {
        transition,
        snapshot,
    }))
}

enum Step {
    Emit(Event),
    Skip,
    Close,
}

/// Server-sent events: a `snapshot` on every state change plus one event per notice.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut notices = state.session.subscribe_notices();
    let mut snapshots = state.session.watch_snapshots();

    let stream = async_stream::stream! {
        let initial = snapshots.borrow_and_update().clone();
        if let Some(event) = snapshot_event(&initial) {
            yield Ok(event);
        }

        loop {
            let step = tokio::select! {
                notice = notices.recv() => match notice {
                    Ok(notice) => match Event::default().event(notice.event_name()).json_data(&notice) {
                        Ok(event) => Step::Emit(event),
                        Err(err) => {
                            tracing::warn!("Failed to encode notice: {}", err);
                            Step::Skip
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Event stream lagged, {} notices dropped", skipped);
                        Step::Skip
                    }
                    Err(RecvError::Closed) => Step::Close,
                },
                changed = snapshots.changed() => match changed {
                    Ok(()) => {
                        let snapshot = snapshots.borrow_and_update().clone();
                        snapshot_event(&snapshot).map_or(Step::Skip, Step::Emit)
                    }
                    Err(_) => Step::Close,
                },
            };

            match step {
                Step::Emit(event) => yield Ok(event),
                Step::Skip => {}
                Step::Close => break,
            }
        }

        tracing::debug!("Run event stream closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &SessionSnapshot) -> Option<Event> {
    match Event::default().event("snapshot").json_data(snapshot) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!("Failed to encode snapshot: {}", err);
            None
        }
    }
}
