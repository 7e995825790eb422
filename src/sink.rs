use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::types::run::RunRecord;

/// Receives finished runs for durable storage.
pub trait PersistenceSink: Send + Sync {
    fn persist(&self, record: RunRecord);
}

/// Keeps finished runs in memory until they age out.
#[derive(Clone, Default)]
pub struct MemorySink {
    runs: Arc<DashMap<Uuid, StoredRun>>,
}

struct StoredRun {
    record: RunRecord,
    inserted_at: Instant,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<RunRecord> {
        self.runs.get(id).map(|entry| entry.record.clone())
    }

    /// Runs ordered by start time, most recent first.
    pub fn list(&self) -> Vec<RunRecord> {
        let mut runs: Vec<RunRecord> = self
            .runs
            .iter()
            .map(|entry| entry.record.clone())
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn evict_expired(&self, ttl: Duration) {
        let now = Instant::now();
        self.runs
            .retain(|_, stored| now.duration_since(stored.inserted_at) < ttl);
        tracing::info!("Run history eviction complete. Current size: {}", self.runs.len());
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&self, record: RunRecord) {
        tracing::info!(
            "Stored run {} ({} points, {:.1} m)",
            record.id,
            record.route.len(),
            record.distance_m
        );
        self.runs.insert(
            record.id,
            StoredRun {
                record,
                inserted_at: Instant::now(),
            },
        );
    }
}
