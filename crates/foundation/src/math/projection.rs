//! Web Mercator projection onto the unit square.
//!
//! `x` grows eastward from 0 (lng -180) to 1 (lng 180); `y` grows southward from
//! 0 (lat ~85.05) to 1 (lat ~-85.05). Multiply by [`world_size_px`] to get pixels.

use std::f64::consts::PI;

use crate::bounds::LngLat;

/// Tile size used by the map surface, in pixels.
pub const TILE_SIZE_PX: f64 = 512.0;

/// Latitude limit of the square Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

pub fn lng_to_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Projects latitude; results are clamped to `[0, 1]` so polar input stays finite.
pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

pub fn project(p: LngLat) -> [f64; 2] {
    [lng_to_x(p.lng), lat_to_y(p.lat)]
}

pub fn unproject(xy: [f64; 2]) -> LngLat {
    LngLat::new(x_to_lng(xy[0]), y_to_lat(xy[1]))
}

/// Size of the whole world in pixels at a fractional zoom.
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * zoom.exp2()
}
