use serde::{Deserialize, Serialize};

use crate::ClusterError;

/// Highest zoom a cluster hierarchy may be built for.
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

/// Tuning for [`crate::ClusterIndex::build`].
///
/// `max_zoom` is the level at which every item is shown individually; clustering
/// happens on `min_zoom..max_zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Merge radius in screen pixels.
    pub radius_px: f64,
    /// Tile extent the radius is measured against.
    pub extent_px: f64,
    /// Smallest group that becomes an aggregate.
    pub min_points: usize,
    /// Leaf bucket size of the per-zoom KD index.
    pub node_size: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 14,
            radius_px: 60.0,
            extent_px: 512.0,
            min_points: 2,
            node_size: 64,
        }
    }
}

impl ClusterOptions {
    pub fn validate(&self) -> Result<(), ClusterError> {
        let invalid = |msg: String| Err(ClusterError::InvalidOptions(msg));

        if self.min_zoom > self.max_zoom {
            return invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return invalid(format!(
                "max_zoom {} exceeds {MAX_SUPPORTED_ZOOM}",
                self.max_zoom
            ));
        }
        if !(self.radius_px.is_finite() && self.radius_px > 0.0) {
            return invalid(format!("radius_px must be positive, got {}", self.radius_px));
        }
        if !(self.extent_px.is_finite() && self.extent_px > 0.0) {
            return invalid(format!("extent_px must be positive, got {}", self.extent_px));
        }
        if self.min_points < 2 {
            return invalid(format!("min_points must be at least 2, got {}", self.min_points));
        }
        if self.node_size == 0 {
            return invalid("node_size must be non-zero".to_string());
        }
        Ok(())
    }

    /// Merge radius at `zoom`, in unit-square coordinates.
    pub fn radius_at(&self, zoom: u8) -> f64 {
        self.radius_px / (self.extent_px * f64::from(zoom).exp2())
    }
}
