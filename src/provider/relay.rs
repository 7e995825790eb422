use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::ProviderError;
use crate::provider::{
    Authorization, FixFilter, LocationProvider, ProviderEvent, Subscription, SubscriptionId,
    WatchOptions, EVENT_BUFFER,
};
use crate::types::coordinate::LocationFix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    Delivered,
    Filtered,
    NoSubscriber,
    Dropped,
}

/// Location provider fed by a device that pushes its fixes over HTTP.
///
/// Holds the device's location authorization and serves a single watch at a time.
pub struct RelayProvider {
    next_id: AtomicU64,
    inner: Mutex<RelayState>,
}

struct RelayState {
    authorization: Authorization,
    active: Option<ActiveWatch>,
}

struct ActiveWatch {
    id: SubscriptionId,
    sender: mpsc::Sender<ProviderEvent>,
    filter: FixFilter,
}

impl RelayProvider {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(RelayState {
                authorization: Authorization::NotDetermined,
                active: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RelayState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_authorization(&self, authorization: Authorization) {
        let mut state = self.state();
        if state.authorization != authorization {
            tracing::info!(
                "Location authorization changed: {:?} -> {:?}",
                state.authorization,
                authorization
            );
        }
        state.authorization = authorization;
    }

    pub fn has_subscriber(&self) -> bool {
        self.state().active.is_some()
    }

    pub fn push_fix(&self, fix: &LocationFix) -> FixOutcome {
        let mut state = self.state();
        let Some(active) = state.active.as_mut() else {
            tracing::debug!("Dropping fix, no active watch");
            return FixOutcome::NoSubscriber;
        };

        let coordinate = fix.coordinate();
        let at = fix.recorded_at.unwrap_or_else(Utc::now);
        if !active.filter.admit(coordinate, at) {
            tracing::trace!("Fix suppressed by watch filter");
            return FixOutcome::Filtered;
        }

        match active.sender.try_send(ProviderEvent::Sample(coordinate)) {
            Ok(()) => FixOutcome::Delivered,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Watch {} is backed up, dropping fix", active.id);
                FixOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Watch {} receiver is gone", active.id);
                state.active = None;
                FixOutcome::NoSubscriber
            }
        }
    }

    /// Forwards a device-side failure to the active watch. Returns false when nobody is listening.
    pub fn push_error(&self, message: &str) -> bool {
        let mut state = self.state();
        let Some(active) = state.active.as_ref() else {
            return false;
        };

        let event = ProviderEvent::Error(ProviderError::PositionUnavailable(message.to_string()));
        match active.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Watch {} is backed up, dropping error report", active.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                state.active = None;
                false
            }
        }
    }
}

impl Default for RelayProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for RelayProvider {
    fn authorization(&self) -> Authorization {
        self.state().authorization
    }

    fn subscribe(&self, options: &WatchOptions) -> Result<Subscription, ProviderError> {
        let mut state = self.state();
        if !state.authorization.is_granted() {
            return Err(ProviderError::PermissionDenied);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = mpsc::channel(EVENT_BUFFER);

        if let Some(previous) = state.active.replace(ActiveWatch {
            id,
            sender,
            filter: FixFilter::new(options),
        }) {
            tracing::warn!("Watch {} replaced by {}", previous.id, id);
        }

        tracing::info!(
            "Watch {} started (high_accuracy={}, min_distance={}m, fastest={}ms)",
            id,
            options.high_accuracy,
            options.min_distance_m,
            options.fastest_interval_ms
        );

        Ok(Subscription { id, events })
    }

    fn cancel(&self, id: SubscriptionId) {
        let mut state = self.state();
        if state.active.as_ref().map(|active| active.id) == Some(id) {
            state.active = None;
            tracing::info!("Watch {} cancelled", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::types::coordinate::Coordinate;

    fn fix(latitude: f64, longitude: f64, second: i64) -> LocationFix {
        LocationFix {
            latitude,
            longitude,
            recorded_at: Some(
                Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(second),
            ),
        }
    }

    #[test]
    fn subscribe_requires_authorization() {
        let relay = RelayProvider::new();
        assert_eq!(
            relay.subscribe(&WatchOptions::default()).unwrap_err(),
            ProviderError::PermissionDenied
        );

        relay.set_authorization(Authorization::Denied);
        assert!(relay.subscribe(&WatchOptions::default()).is_err());
        assert!(!relay.has_subscriber());

        relay.set_authorization(Authorization::WhenInUse);
        assert!(relay.subscribe(&WatchOptions::default()).is_ok());
        assert!(relay.has_subscriber());
    }

    #[test]
    fn delivers_filtered_fixes_to_the_active_watch() {
        let relay = RelayProvider::new();
        relay.set_authorization(Authorization::Always);
        let mut subscription = relay.subscribe(&WatchOptions::default()).unwrap();

        assert_eq!(relay.push_fix(&fix(0.0, 0.0, 0)), FixOutcome::Delivered);
        assert_eq!(relay.push_fix(&fix(0.0, 0.00002, 5)), FixOutcome::Filtered);
        assert_eq!(relay.push_fix(&fix(0.0, 0.0001, 10)), FixOutcome::Delivered);

        assert_eq!(
            subscription.events.try_recv().unwrap(),
            ProviderEvent::Sample(Coordinate::new(0.0, 0.0))
        );
        assert_eq!(
            subscription.events.try_recv().unwrap(),
            ProviderEvent::Sample(Coordinate::new(0.0, 0.0001))
        );
        assert!(subscription.events.try_recv().is_err());
    }

    #[test]
    fn cancelled_watch_stops_receiving() {
        let relay = RelayProvider::new();
        relay.set_authorization(Authorization::WhenInUse);
        let subscription = relay.subscribe(&WatchOptions::default()).unwrap();

        relay.cancel(subscription.id);
        assert!(!relay.has_subscriber());
        assert_eq!(relay.push_fix(&fix(1.0, 1.0, 0)), FixOutcome::NoSubscriber);
        assert!(!relay.push_error("gps off"));
    }

    #[test]
    fn cancelling_a_stale_id_keeps_the_newer_watch() {
        let relay = RelayProvider::new();
        relay.set_authorization(Authorization::WhenInUse);
        let first = relay.subscribe(&WatchOptions::default()).unwrap();
        let _second = relay.subscribe(&WatchOptions::default()).unwrap();

        relay.cancel(first.id);
        assert!(relay.has_subscriber());
    }

    #[test]
    fn dropped_receiver_clears_the_watch() {
        let relay = RelayProvider::new();
        relay.set_authorization(Authorization::WhenInUse);
        drop(relay.subscribe(&WatchOptions::default()).unwrap());

        assert_eq!(relay.push_fix(&fix(1.0, 1.0, 0)), FixOutcome::NoSubscriber);
        assert!(!relay.has_subscriber());
    }

    #[test]
    fn errors_reach_the_watch() {
        let relay = RelayProvider::new();
        relay.set_authorization(Authorization::WhenInUse);
        let mut subscription = relay.subscribe(&WatchOptions::default()).unwrap();

        assert!(relay.push_error("signal lost"));
        assert_eq!(
            subscription.events.try_recv().unwrap(),
            ProviderEvent::Error(ProviderError::PositionUnavailable("signal lost".to_string()))
        );
    }
}
