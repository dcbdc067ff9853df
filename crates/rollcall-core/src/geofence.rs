//! Geofence check - great-circle distance against a fixed allowed radius.

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (latitude, longitude) points in
/// degrees, via the haversine formula. Result in kilometers.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let lat_a = a.0.to_radians();
    let lat_b = b.0.to_radians();
    let d_lat = (b.0 - a.0).to_radians();
    let d_lon = (b.1 - a.1).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Whether a live location is within `radius_km` of the fixed location.
///
/// An absent live location (failed geocode) fails closed. The boundary is
/// inclusive: a point at exactly `radius_km` passes.
pub fn within_range(live: Option<(f64, f64)>, fixed: (f64, f64), radius_km: f64) -> bool {
    match live {
        Some(point) => haversine_km(point, fixed) <= radius_km,
        None => false,
    }
}
