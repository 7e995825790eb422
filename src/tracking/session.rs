use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::error::{ProviderError, TrackingError};
use crate::provider::{LocationProvider, ProviderEvent, SubscriptionId, WatchOptions};
use crate::sink::PersistenceSink;
use crate::tracking::geo::haversine_distance;
use crate::types::coordinate::{Coordinate, MapRegion};
use crate::types::run::{format_distance, Notice, RunRecord, SessionSnapshot, SessionStatus, Transition};

const NOTICE_BUFFER: usize = 16;

/// Lifecycle of one run: start, accumulate distance over incoming samples, stop.
///
/// Samples are applied in arrival order and only while the session is running.
/// Dropping the session cancels any live subscription.
pub struct TrackingSession {
    provider: Arc<dyn LocationProvider>,
    sink: Option<Arc<dyn PersistenceSink>>,
    options: WatchOptions,
    status: SessionStatus,
    route: Vec<Coordinate>,
    distance_m: f64,
    last_sample: Option<Coordinate>,
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    subscription: Option<ActiveSubscription>,
    notices: broadcast::Sender<Notice>,
}

struct ActiveSubscription {
    id: SubscriptionId,
    events: mpsc::Receiver<ProviderEvent>,
    exhausted: bool,
}

impl TrackingSession {
    pub fn new(provider: Arc<dyn LocationProvider>, options: WatchOptions) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            provider,
            sink: None,
            options,
            status: SessionStatus::Idle,
            route: Vec::new(),
            distance_m: 0.0,
            last_sample: None,
            run_id: None,
            started_at: None,
            subscription: None,
            notices,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn route(&self) -> &[Coordinate] {
        &self.route
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn last_sample(&self) -> Option<Coordinate> {
        self.last_sample
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub(crate) fn notice_sender(&self) -> broadcast::Sender<Notice> {
        self.notices.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            route: self.route.clone(),
            distance_m: self.distance_m,
            distance_km: self.distance_m / 1000.0,
            distance_label: format_distance(self.distance_m),
            last_sample: self.last_sample,
            region: MapRegion::around(self.last_sample),
            run_id: self.run_id,
            started_at: self.started_at,
        }
    }

    /// Starts a new run. A no-op while already running.
    pub fn start(&mut self) -> Result<Transition, TrackingError> {
        if self.is_running() {
            tracing::debug!("Start ignored, run {:?} already in progress", self.run_id);
            return Ok(Transition::Unchanged);
        }

        let subscription = match self.provider.subscribe(&self.options) {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!("Could not start run: {}", err);
                self.notify(match &err {
                    ProviderError::PermissionDenied => Notice::PermissionDenied,
                    other => Notice::ProviderError {
                        message: other.to_string(),
                    },
                });
                return Err(err.into());
            }
        };

        self.route.clear();
        self.distance_m = 0.0;
        self.last_sample = None;
        self.run_id = Some(Uuid::new_v4());
        self.started_at = Some(Utc::now());
        self.status = SessionStatus::Running;
        self.subscription = Some(ActiveSubscription {
            id: subscription.id,
            events: subscription.events,
            exhausted: false,
        });

        tracing::info!("Run {:?} started on {}", self.run_id, subscription.id);
        Ok(Transition::Started)
    }

    /// Stops the current run, keeping its route and distance for display. A no-op while idle.
    pub fn stop(&mut self) -> Transition {
        if !self.is_running() {
            return Transition::Unchanged;
        }

        self.release_subscription();
        self.status = SessionStatus::Idle;

        tracing::info!(
            "Run {:?} stopped: {} samples, {:.1} m",
            self.run_id,
            self.route.len(),
            self.distance_m
        );

        if let (Some(sink), Some(id), Some(started_at)) = (&self.sink, self.run_id, self.started_at) {
            sink.persist(RunRecord {
                id,
                route: self.route.clone(),
                distance_m: self.distance_m,
                started_at,
                ended_at: Utc::now(),
            });
        }

        Transition::Stopped
    }

    /// Applies one sample. Returns false when the sample was dropped because no run is active.
    pub fn on_sample(&mut self, sample: Coordinate) -> bool {
        if !self.is_running() {
            tracing::trace!("Dropping sample delivered while idle");
            return false;
        }

        if let Some(previous) = self.route.last() {
            self.distance_m += haversine_distance(*previous, sample);
        }
        self.route.push(sample);
        self.last_sample = Some(sample);
        true
    }

    /// Surfaces a provider failure without changing state; the provider owns any recovery.
    pub fn on_provider_error(&mut self, err: ProviderError) {
        if !self.is_running() {
            return;
        }

        tracing::warn!("Location provider error during run {:?}: {}", self.run_id, err);
        self.notify(Notice::ProviderError {
            message: err.to_string(),
        });
    }

    pub fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::Sample(sample) => {
                self.on_sample(sample);
            }
            ProviderEvent::Error(err) => self.on_provider_error(err),
        }
    }

    /// Waits for the next provider event. Pends forever while there is no live subscription.
    ///
    /// Cancel safe, so it can sit in a `select!` next to a command channel.
    pub async fn next_event(&mut self) -> ProviderEvent {
        if let Some(subscription) = self.subscription.as_mut() {
            if !subscription.exhausted {
                match subscription.events.recv().await {
                    Some(event) => return event,
                    None => {
                        tracing::info!("Location stream {} ended", subscription.id);
                        subscription.exhausted = true;
                    }
                }
            }
        }
        std::future::pending::<ProviderEvent>().await
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.provider.cancel(subscription.id);
        }
    }

    fn notify(&self, notice: Notice) {
        // nobody listening is fine
        let _ = self.notices.send(notice);
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if self.subscription.is_some() {
            tracing::debug!("Releasing location subscription on teardown");
            self.release_subscription();
        }
    }
}
