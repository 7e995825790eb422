use std::path::PathBuf;
use std::time::Duration;

use crate::provider::WatchOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// Fixes pushed by a device through the `/api/device` routes.
    Relay,
    /// Fixes replayed from a recorded GPX track.
    Replay,
}

impl LocationSource {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "relay" => Some(LocationSource::Relay),
            "replay" => Some(LocationSource::Replay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub location_source: LocationSource,
    pub replay_gpx_path: Option<PathBuf>,
    pub watch: WatchOptions,
    pub run_history_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            location_source: LocationSource::Relay,
            replay_gpx_path: None,
            watch: WatchOptions::default(),
            run_history_ttl: Duration::from_secs(86_400),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let location_source = std::env::var("LOCATION_SOURCE")
            .ok()
            .and_then(|s| LocationSource::from_name(&s))
            .unwrap_or(defaults.location_source);

        let replay_gpx_path = std::env::var("REPLAY_GPX_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let watch = WatchOptions {
            high_accuracy: env_parse("LOCATION_HIGH_ACCURACY")
                .unwrap_or(defaults.watch.high_accuracy),
            min_distance_m: env_parse("LOCATION_MIN_DISTANCE_M")
                .unwrap_or(defaults.watch.min_distance_m),
            interval_ms: env_parse("LOCATION_INTERVAL_MS").unwrap_or(defaults.watch.interval_ms),
            fastest_interval_ms: env_parse("LOCATION_FASTEST_INTERVAL_MS")
                .unwrap_or(defaults.watch.fastest_interval_ms),
        };

        let run_history_ttl = env_parse("RUN_HISTORY_TTL_SECONDS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.run_history_ttl);

        Self {
            port,
            location_source,
            replay_gpx_path,
            watch,
            run_history_ttl,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_source_names_are_case_insensitive() {
        assert_eq!(LocationSource::from_name("Relay"), Some(LocationSource::Relay));
        assert_eq!(LocationSource::from_name(" replay "), Some(LocationSource::Replay));
        assert_eq!(LocationSource::from_name("bluetooth"), None);
    }

    #[test]
    fn default_config_uses_the_relay_and_standard_watch() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.location_source, LocationSource::Relay);
        assert!(config.replay_gpx_path.is_none());
        assert_eq!(config.watch, WatchOptions::default());
        assert_eq!(config.run_history_ttl, Duration::from_secs(86_400));
    }
}
