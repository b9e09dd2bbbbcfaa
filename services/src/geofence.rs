//! Great-circle distance checks for geofenced sessions.

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Fixed operating radius for all geofenced sessions.
pub const GEOFENCE_RADIUS_METERS: f64 = 50.0;

/// Haversine distance between two coordinate pairs, in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

pub fn within_radius(distance_meters: f64, radius_meters: f64) -> bool {
    distance_meters <= radius_meters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_meters(41.015, 28.979, 41.015, 28.979), 0.0);
        assert_eq!(distance_meters(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(distance_meters(-33.918, 18.423, -33.918, 18.423), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_meters(41.015, 28.979, 41.024, 28.991);
        let back = distance_meters(41.024, 28.991, 41.015, 28.979);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn known_meridian_distance() {
        // 0.009 degrees of latitude is ~1000 m of meridian arc
        let d = distance_meters(41.015, 28.979, 41.024, 28.979);
        assert!((990.0..1010.0).contains(&d), "got {d}");
    }

    #[test]
    fn radius_check_includes_boundary() {
        assert!(within_radius(0.0, GEOFENCE_RADIUS_METERS));
        assert!(within_radius(50.0, GEOFENCE_RADIUS_METERS));
        assert!(!within_radius(50.001, GEOFENCE_RADIUS_METERS));
    }

    #[test]
    fn nearby_point_is_within_operating_radius() {
        // ~5 m north of the origin
        let d = distance_meters(41.015, 28.979, 41.015045, 28.979);
        assert!(d < GEOFENCE_RADIUS_METERS, "got {d}");
    }

    #[test]
    fn distant_point_is_outside_operating_radius() {
        // ~500 m north of the origin
        let d = distance_meters(41.015, 28.979, 41.0195, 28.979);
        assert!(d > 400.0 && d < 600.0, "got {d}");
        assert!(!within_radius(d, GEOFENCE_RADIUS_METERS));
    }
}
