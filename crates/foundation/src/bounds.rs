use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in a planar coordinate space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }
}

/// A WGS84 position in decimal degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns `true` for finite coordinates inside the WGS84 domain.
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Brings longitude into `[-180, 180]`; see [`normalize_lng`].
    pub fn wrapped(self) -> Self {
        Self::new(normalize_lng(self.lng), self.lat)
    }
}

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_lng(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

/// Like [`wrap_lng`], but longitudes already in `[-180, 180]` are returned
/// unchanged, so a position on the antimeridian stays at `180`.
pub fn normalize_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        wrap_lng(lng)
    }
}

/// Geographic bounding box (west, south, east, north) in degrees.
///
/// `west`/`east` may lie outside `[-180, 180]` when the box was derived from a
/// camera that sees more than one copy of the world, or straddles the antimeridian.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LngLatBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Returns `true` when the box covers every longitude.
    pub fn spans_world(&self) -> bool {
        self.east - self.west >= 360.0
    }

    /// Returns `true` when, after wrapping, the western edge lies east of the eastern edge.
    pub fn crosses_antimeridian(&self) -> bool {
        if self.spans_world() {
            return false;
        }
        let west = wrap_lng(self.west);
        let east = if self.east == 180.0 {
            180.0
        } else {
            wrap_lng(self.east)
        };
        west > east
    }

    pub fn contains(&self, p: LngLat) -> bool {
        if p.lat < self.south || p.lat > self.north {
            return false;
        }
        if self.spans_world() {
            return true;
        }
        let lng = normalize_lng(p.lng);
        let west = wrap_lng(self.west);
        let east = if self.east == 180.0 {
            180.0
        } else {
            wrap_lng(self.east)
        };
        if west <= east {
            lng >= west && lng <= east
        } else {
            lng >= west || lng <= east
        }
    }
}
