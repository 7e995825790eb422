use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::coordinate::{Coordinate, MapRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
}

/// Whether a Start/Stop command changed the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Started,
    Stopped,
    Unchanged,
}

/// Read-only view of a session for rendering the path overlay and distance readout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub route: Vec<Coordinate>,
    pub distance_m: f64,
    pub distance_km: f64,
    pub distance_label: String,
    pub last_sample: Option<Coordinate>,
    pub region: MapRegion,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

/// A finished run as handed to a persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub route: Vec<Coordinate>,
    pub distance_m: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn duration_seconds(&self) -> u64 {
        (self.ended_at - self.started_at).num_seconds().max(0) as u64
    }
}

/// One-shot notification surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    PermissionDenied,
    ProviderError { message: String },
}

impl Notice {
    pub fn event_name(&self) -> &'static str {
        match self {
            Notice::PermissionDenied => "permission_denied",
            Notice::ProviderError { .. } => "provider_error",
        }
    }
}

pub fn format_distance(distance_m: f64) -> String {
    format!("{:.2} km", distance_m / 1000.0)
}
