use crate::bounds::LngLat;

/// Mean Earth radius (meters), used for spherical approximations.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance between two positions, in meters.
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng * 0.5).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Moves `origin` by small east/north offsets in meters.
///
/// Equirectangular approximation; accurate to well under a meter for offsets of
/// a few kilometers away from the poles.
pub fn offset_m(origin: LngLat, east_m: f64, north_m: f64) -> LngLat {
    let dlat = (north_m / EARTH_MEAN_RADIUS_M).to_degrees();
    let dlng = (east_m / (EARTH_MEAN_RADIUS_M * origin.lat.to_radians().cos())).to_degrees();
    LngLat::new(origin.lng + dlng, origin.lat + dlat)
}
