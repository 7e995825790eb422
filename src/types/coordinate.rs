use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A position report as a device sends it to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl LocationFix {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Map viewport for the route overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MapRegion {
    const DEFAULT_CENTER: Coordinate = Coordinate {
        latitude: 37.78825,
        longitude: -122.4324,
    };
    const SPAN: f64 = 0.01;

    pub fn around(center: Option<Coordinate>) -> Self {
        let center = center.unwrap_or(Self::DEFAULT_CENTER);
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            latitude_delta: Self::SPAN,
            longitude_delta: Self::SPAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_falls_back_to_default_center() {
        let region = MapRegion::around(None);
        assert_eq!(region.latitude, 37.78825);
        assert_eq!(region.longitude, -122.4324);
        assert_eq!(region.latitude_delta, 0.01);

        let region = MapRegion::around(Some(Coordinate::new(52.52, 13.405)));
        assert_eq!(region.latitude, 52.52);
        assert_eq!(region.longitude, 13.405);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }
}
