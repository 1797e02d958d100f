use foundation::math::projection::{MAX_MERCATOR_LAT, project, unproject, world_size_px};
use foundation::{LngLat, LngLatBounds, normalize_lng};
use serde::{Deserialize, Serialize};

/// Camera of a flat Web Mercator map: centre, fractional zoom and the size of
/// the surface it is drawn on. There is no bearing or pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LngLat,
    pub zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
}

impl Viewport {
    /// Builds a viewport with the centre wrapped and clamped onto the map.
    pub fn new(center: LngLat, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center: clamp_center(center),
            zoom,
            width_px: width_px.max(1.0),
            height_px: height_px.max(1.0),
        }
    }

    pub fn world_px(&self) -> f64 {
        world_size_px(self.zoom)
    }

    /// Centre in world pixels at the current zoom.
    pub fn center_px(&self) -> [f64; 2] {
        let [x, y] = project(self.center);
        let world = self.world_px();
        [x * world, y * world]
    }

    /// Visible box. `west`/`east` are left unwrapped so a camera looking across
    /// the antimeridian, or at more than one world, is described faithfully.
    pub fn bounds(&self) -> LngLatBounds {
        let world = self.world_px();
        let [cx, cy] = self.center_px();
        let half_w = self.width_px * 0.5;
        let half_h = self.height_px * 0.5;

        let west = unproject([(cx - half_w) / world, 0.5]).lng;
        let east = unproject([(cx + half_w) / world, 0.5]).lng;
        let north = unproject([0.5, ((cy - half_h) / world).clamp(0.0, 1.0)]).lat;
        let south = unproject([0.5, ((cy + half_h) / world).clamp(0.0, 1.0)]).lat;
        LngLatBounds::new(west, south, east, north)
    }

    /// Screen position of a coordinate, relative to the top-left corner.
    ///
    /// Longitudes are taken on the world copy closest to the centre.
    pub fn to_screen(&self, p: LngLat) -> [f64; 2] {
        let world = self.world_px();
        let [cx, cy] = self.center_px();
        let [x, y] = project(p);
        let dx = (x * world - cx + 0.5 * world).rem_euclid(world) - 0.5 * world;
        [
            self.width_px * 0.5 + dx,
            self.height_px * 0.5 + (y * world - cy),
        ]
    }

    pub fn from_screen(&self, px: [f64; 2]) -> LngLat {
        let world = self.world_px();
        let [cx, cy] = self.center_px();
        let x = (cx + px[0] - self.width_px * 0.5) / world;
        let y = (cy + px[1] - self.height_px * 0.5) / world;
        clamp_center(unproject([x, y.clamp(0.0, 1.0)]))
    }

    /// Moves the camera so the map content follows a drag of `(dx, dy)` pixels.
    pub fn panned(&self, dx_px: f64, dy_px: f64) -> Self {
        let center = self.from_screen([
            self.width_px * 0.5 - dx_px,
            self.height_px * 0.5 - dy_px,
        ]);
        Self { center, ..*self }
    }

    /// Zooms to `zoom` keeping the coordinate under `around_px` fixed on screen.
    pub fn zoomed_around(&self, zoom: f64, around_px: [f64; 2]) -> Self {
        let anchor = project(self.from_screen(around_px));
        let world = world_size_px(zoom);
        let offset = [
            around_px[0] - self.width_px * 0.5,
            around_px[1] - self.height_px * 0.5,
        ];
        let center = unproject([
            anchor[0] - offset[0] / world,
            (anchor[1] - offset[1] / world).clamp(0.0, 1.0),
        ]);
        Self {
            center: clamp_center(center),
            zoom,
            ..*self
        }
    }

    pub fn resized(&self, width_px: f64, height_px: f64) -> Self {
        Self::new(self.center, self.zoom, width_px, height_px)
    }
}

/// Wraps longitude and keeps latitude inside the square Mercator world.
pub fn clamp_center(p: LngLat) -> LngLat {
    let lat = if p.lat.is_nan() {
        0.0
    } else {
        p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
    };
    let lng = if p.lng.is_finite() {
        normalize_lng(p.lng)
    } else {
        0.0
    };
    LngLat::new(lng, lat)
}
