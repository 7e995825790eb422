use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ProviderError;
use crate::provider::{
    parse_track, Authorization, FixFilter, LocationProvider, ProviderEvent, Subscription,
    SubscriptionId, WatchOptions, EVENT_BUFFER,
};
use crate::types::coordinate::Coordinate;

/// Replays a recorded track as if it were a live device, one fix per poll interval.
pub struct ReplayProvider {
    track: Arc<Vec<Coordinate>>,
    next_id: AtomicU64,
    watches: DashMap<SubscriptionId, JoinHandle<()>>,
}

impl ReplayProvider {
    pub fn new(track: Vec<Coordinate>) -> Self {
        Self {
            track: Arc::new(track),
            next_id: AtomicU64::new(1),
            watches: DashMap::new(),
        }
    }

    pub fn from_gpx(bytes: &[u8]) -> Result<Self, ProviderError> {
        Ok(Self::new(parse_track(bytes)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ProviderError::InvalidTrack(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let provider = Self::from_gpx(&bytes)?;
        tracing::info!(
            "Loaded replay track {} ({} points)",
            path.display(),
            provider.track.len()
        );
        Ok(provider)
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

impl LocationProvider for ReplayProvider {
    fn authorization(&self) -> Authorization {
        Authorization::Always
    }

    fn subscribe(&self, options: &WatchOptions) -> Result<Subscription, ProviderError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = mpsc::channel(EVENT_BUFFER);
        let track = self.track.clone();
        let period = Duration::from_millis(options.interval_ms.max(options.fastest_interval_ms).max(1));
        let mut filter = FixFilter::new(&WatchOptions {
            // pacing already honours the fastest interval
            fastest_interval_ms: 0,
            ..*options
        });

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            for coordinate in track.iter().copied() {
                ticker.tick().await;
                if !filter.admit(coordinate, Utc::now()) {
                    continue;
                }
                if sender.send(ProviderEvent::Sample(coordinate)).await.is_err() {
                    return;
                }
            }
            tracing::info!("Replay {} reached the end of the track", id);
        });

        self.watches.insert(id, handle);
        tracing::info!("Replay {} started, one fix every {:?}", id, period);

        Ok(Subscription { id, events })
    }

    fn cancel(&self, id: SubscriptionId) {
        if let Some((_, handle)) = self.watches.remove(&id) {
            handle.abort();
            tracing::info!("Replay {} cancelled", id);
        }
    }
}

impl Drop for ReplayProvider {
    fn drop(&mut self) {
        for entry in self.watches.iter() {
            entry.value().abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> WatchOptions {
        WatchOptions {
            interval_ms: 10,
            fastest_interval_ms: 5,
            ..WatchOptions::default()
        }
    }

    #[tokio::test]
    async fn replays_points_in_order_then_closes() {
        let track = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.0001),
            Coordinate::new(0.0, 0.0002),
        ];
        let provider = ReplayProvider::new(track.clone());
        let mut subscription = provider.subscribe(&options()).unwrap();

        for expected in track {
            assert_eq!(
                subscription.events.recv().await,
                Some(ProviderEvent::Sample(expected))
            );
        }
        assert_eq!(subscription.events.recv().await, None);
    }

    #[tokio::test]
    async fn skips_points_closer_than_min_distance() {
        let provider = ReplayProvider::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.00001),
            Coordinate::new(0.0, 0.0002),
        ]);
        let mut subscription = provider.subscribe(&options()).unwrap();

        assert_eq!(
            subscription.events.recv().await,
            Some(ProviderEvent::Sample(Coordinate::new(0.0, 0.0)))
        );
        assert_eq!(
            subscription.events.recv().await,
            Some(ProviderEvent::Sample(Coordinate::new(0.0, 0.0002)))
        );
    }

    #[tokio::test]
    async fn cancel_stops_the_replay_task() {
        let provider = ReplayProvider::new(vec![Coordinate::new(0.0, 0.0); 100]);
        let mut subscription = provider.subscribe(&options()).unwrap();
        assert_eq!(provider.active_watches(), 1);

        provider.cancel(subscription.id);
        assert_eq!(provider.active_watches(), 0);
        while subscription.events.recv().await.is_some() {}
    }

    #[test]
    fn is_always_authorized() {
        let provider = ReplayProvider::new(vec![Coordinate::new(0.0, 0.0)]);
        assert!(provider.authorization().is_granted());
    }
}
