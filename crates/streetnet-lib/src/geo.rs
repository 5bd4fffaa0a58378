//! Great-circle geometry on a spherical earth.

/// Mean earth radius used for all distances, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6376.5;

/// Great-circle (haversine) distance between two coordinates in kilometres.
pub fn great_circle_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Project a coordinate onto the unit sphere.
///
/// Euclidean (chord) distance between projected points is monotonic in
/// great-circle distance, so nearest-neighbour order is preserved.
pub fn unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(great_circle_km(52.5, 13.4, 52.5, 13.4), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = great_circle_km(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_KM * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-9, "got {d}, expected {expected}");
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = great_circle_km(48.137, 11.575, 52.520, 13.405);
        let ba = great_circle_km(52.520, 13.405, 48.137, 11.575);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 500.0 && ab < 510.0, "Munich-Berlin was {ab}");
    }

    #[test]
    fn unit_sphere_points_have_unit_norm() {
        let [x, y, z] = unit_sphere(47.3, 8.5);
        let norm = (x * x + y * y + z * z).sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
