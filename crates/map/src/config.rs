use cluster::{ClusterError, ClusterOptions};
use foundation::LngLat;
use foundation::math::projection::MAX_MERCATOR_LAT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product default: the whole world is visible with Brussels in the middle.
pub const DEFAULT_CENTER: LngLat = LngLat {
    lng: 4.3517,
    lat: 50.8503,
};
pub const DEFAULT_ZOOM: f64 = 0.75;
pub const DEFAULT_EASE_MS: u64 = 1000;
pub const DEFAULT_POPUP_OFFSET_PX: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cluster options: {0}")]
    Cluster(#[from] ClusterError),
    #[error("camera zoom range {min}..{max} is empty or not finite")]
    ZoomRange { min: f64, max: f64 },
    #[error("initial camera is invalid: {0}")]
    InitialCamera(String),
    #[error("viewport size {width}x{height} must be positive")]
    Viewport { width: f64, height: f64 },
    #[error("could not parse config: {0}")]
    Parse(String),
    #[error("invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },
}

/// Zoom range the user can reach by gestures or flights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            min_zoom: 0.75,
            max_zoom: 18.0,
        }
    }
}

impl CameraLimits {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub cluster: ClusterOptions,
    pub camera: CameraLimits,
    pub initial_center: LngLat,
    pub initial_zoom: f64,
    pub ease_duration_ms: u64,
    /// `[width, height]` of the map surface.
    pub viewport_px: [f64; 2],
    pub popup_offset_px: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            camera: CameraLimits::default(),
            initial_center: DEFAULT_CENTER,
            initial_zoom: DEFAULT_ZOOM,
            ease_duration_ms: DEFAULT_EASE_MS,
            viewport_px: [1280.0, 720.0],
            popup_offset_px: DEFAULT_POPUP_OFFSET_PX,
        }
    }
}

impl MapConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cluster.validate()?;

        let CameraLimits { min_zoom, max_zoom } = self.camera;
        if !min_zoom.is_finite() || !max_zoom.is_finite() || min_zoom > max_zoom || min_zoom < 0.0
        {
            return Err(ConfigError::ZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }

        let center = self.initial_center;
        if !center.is_valid() || center.lat.abs() > MAX_MERCATOR_LAT {
            return Err(ConfigError::InitialCamera(format!(
                "center {},{} is outside the map",
                center.lng, center.lat
            )));
        }
        if !(min_zoom..=max_zoom).contains(&self.initial_zoom) {
            return Err(ConfigError::InitialCamera(format!(
                "zoom {} is outside {min_zoom}..{max_zoom}",
                self.initial_zoom
            )));
        }

        let [width, height] = self.viewport_px;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::Viewport { width, height });
        }
        Ok(())
    }

    pub fn ease_duration_s(&self) -> f64 {
        self.ease_duration_ms as f64 / 1000.0
    }
}
