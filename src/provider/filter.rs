use chrono::{DateTime, Utc};

use crate::provider::WatchOptions;
use crate::tracking::geo::haversine_distance;
use crate::types::coordinate::Coordinate;

/// Provider-side suppression of fixes that are too close or too frequent.
#[derive(Debug, Clone)]
pub struct FixFilter {
    min_distance_m: f64,
    fastest_interval_ms: i64,
    last: Option<(Coordinate, DateTime<Utc>)>,
}

impl FixFilter {
    pub fn new(options: &WatchOptions) -> Self {
        Self {
            min_distance_m: options.min_distance_m.max(0.0),
            fastest_interval_ms: options.fastest_interval_ms.min(i64::MAX as u64) as i64,
            last: None,
        }
    }

    /// Returns true and remembers the fix when it should be delivered.
    pub fn admit(&mut self, coordinate: Coordinate, at: DateTime<Utc>) -> bool {
        if let Some((last_coordinate, last_at)) = self.last {
            let elapsed_ms = (at - last_at).num_milliseconds();
            if elapsed_ms < self.fastest_interval_ms {
                return false;
            }
            if haversine_distance(last_coordinate, coordinate) < self.min_distance_m {
                return false;
            }
        }

        self.last = Some((coordinate, at));
        true
    }
}
