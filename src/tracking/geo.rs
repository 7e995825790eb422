use crate::types::coordinate::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters on a spherical Earth.
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of consecutive haversine steps, in path order.
pub fn path_length(route: &[Coordinate]) -> f64 {
    route
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}
