//! Geodesic helpers.
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

/// Mean Earth radius (IUGG) in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Speed implied by covering `distance_km` in `elapsed_s` seconds.
///
/// Returns `None` when the elapsed time is not positive.
#[must_use]
pub fn implied_speed_kmh(distance_km: f64, elapsed_s: f64) -> Option<f64> {
    (elapsed_s > 0.0).then(|| distance_km / (elapsed_s / 3600.0))
}

/// Rounds a coordinate to 6 decimal places (about 0.1 m).
#[inline]
#[must_use]
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Converts a coordinate to integer micro-degrees, rounding to 6 decimals.
#[inline]
#[must_use]
pub fn micro_degrees(value: f64) -> i64 {
    (value * 1e6).round() as i64
}
