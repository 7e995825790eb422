use std::sync::Arc;

use crate::config::{Config, LocationSource};
use crate::error::{AppError, ProviderError};
use crate::provider::{LocationProvider, RelayProvider, ReplayProvider};
use crate::sink::MemorySink;
use crate::tracking::{spawn_session, SessionHandle, TrackingSession};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
    pub runs: MemorySink,
    relay: Option<Arc<RelayProvider>>,
}

impl AppState {
    /// Builds the configured location source and spawns the tracking session.
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Result<Self, ProviderError> {
        let (provider, relay): (Arc<dyn LocationProvider>, Option<Arc<RelayProvider>>) =
            match config.location_source {
                LocationSource::Relay => {
                    let relay = Arc::new(RelayProvider::new());
                    let provider: Arc<dyn LocationProvider> = relay.clone();
                    (provider, Some(relay))
                }
                LocationSource::Replay => {
                    let path = config.replay_gpx_path.as_deref().ok_or_else(|| {
                        ProviderError::InvalidTrack("REPLAY_GPX_PATH is not set".to_string())
                    })?;
                    let provider: Arc<dyn LocationProvider> =
                        Arc::new(ReplayProvider::from_path(path)?);
                    (provider, None)
                }
            };

        let runs = MemorySink::new();
        let session = TrackingSession::new(provider, config.watch).with_sink(Arc::new(runs.clone()));

        Ok(Self {
            config: Arc::new(config),
            session: spawn_session(session),
            runs,
            relay,
        })
    }

    /// The device relay, when fixes come from a device rather than a replay.
    pub fn relay(&self) -> Result<&RelayProvider, AppError> {
        self.relay.as_deref().ok_or_else(|| {
            AppError::Conflict("Location source is a replay, device input is disabled".to_string())
        })
    }
}
