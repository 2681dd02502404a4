//! Great-circle distance

use shared::GeoPoint;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates, in kilometers
///
/// Inputs are (lat, lng) pairs in degrees.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint::new(12.9716, 77.5946);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn known_city_pair() {
        // Bengaluru -> Chennai is roughly 290 km as the crow flies
        let blr = GeoPoint::new(12.9716, 77.5946);
        let maa = GeoPoint::new(13.0827, 80.2707);
        let d = haversine_km(blr, maa);
        assert!((280.0..300.0).contains(&d), "got {}", d);
    }

    #[test]
    fn symmetric() {
        let a = GeoPoint::new(19.0760, 72.8777);
        let b = GeoPoint::new(18.5204, 73.8567);
        let ab = haversine_km(a, b);
        let ba = haversine_km(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }
}
