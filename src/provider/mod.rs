mod filter;
mod gpx;
pub mod relay;
pub mod replay;

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::types::coordinate::Coordinate;

pub use filter::FixFilter;
pub use gpx::parse_track;
pub use relay::{FixOutcome, RelayProvider};
pub use replay::ReplayProvider;

/// Capacity of each subscription's event channel.
pub const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    NotDetermined,
    Denied,
    WhenInUse,
    Always,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        matches!(self, Authorization::WhenInUse | Authorization::Always)
    }
}

/// Options for a live location watch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Fixes closer than this to the last delivered one are suppressed.
    pub min_distance_m: f64,
    pub interval_ms: u64,
    /// Fixes arriving sooner than this after the last delivered one are suppressed.
    pub fastest_interval_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            min_distance_m: 10.0,
            interval_ms: 5000,
            fastest_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Sample(Coordinate),
    Error(ProviderError),
}

/// A live registration for future location events.
///
/// Dropping `events` discards anything still buffered in the channel.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<ProviderEvent>,
}

pub trait LocationProvider: Send + Sync {
    fn authorization(&self) -> Authorization;

    /// Fails with [`ProviderError::PermissionDenied`] when location access is not granted.
    fn subscribe(&self, options: &WatchOptions) -> Result<Subscription, ProviderError>;

    fn cancel(&self, id: SubscriptionId);
}
