//! Map configuration for the command line: an optional JSON file, then
//! environment overrides.

use std::path::Path;
use std::str::FromStr;

use map::{ConfigError, MapConfig};

use crate::args::parse_viewport;

pub const ENV_CLUSTER_RADIUS: &str = "MEMORIAL_CLUSTER_RADIUS";
pub const ENV_CLUSTER_MAX_ZOOM: &str = "MEMORIAL_CLUSTER_MAX_ZOOM";
pub const ENV_CLUSTER_MIN_POINTS: &str = "MEMORIAL_CLUSTER_MIN_POINTS";
pub const ENV_EASE_MS: &str = "MEMORIAL_EASE_MS";
pub const ENV_VIEWPORT: &str = "MEMORIAL_VIEWPORT";

/// Reads `path` (defaults when absent), applies the process environment and
/// validates the result.
pub fn load(path: Option<&Path>) -> Result<MapConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
            MapConfig::from_json(&json)?
        }
        None => MapConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Applies overrides found through `lookup`. Unset variables leave the config
/// untouched; set but unparsable ones are an error.
pub fn apply_env(
    config: &mut MapConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(radius) = env_var::<f64>(&lookup, ENV_CLUSTER_RADIUS)? {
        config.cluster.radius_px = radius;
    }
    if let Some(max_zoom) = env_var::<u8>(&lookup, ENV_CLUSTER_MAX_ZOOM)? {
        config.cluster.max_zoom = max_zoom;
    }
    if let Some(min_points) = env_var::<usize>(&lookup, ENV_CLUSTER_MIN_POINTS)? {
        config.cluster.min_points = min_points;
    }
    if let Some(ease_ms) = env_var::<u64>(&lookup, ENV_EASE_MS)? {
        config.ease_duration_ms = ease_ms;
    }
    if let Some(raw) = lookup(ENV_VIEWPORT) {
        config.viewport_px = parse_viewport(&raw).map_err(|_| ConfigError::Env {
            key: ENV_VIEWPORT,
            value: raw,
        })?;
    }
    Ok(())
}

fn env_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_environment_keeps_defaults() {
        let mut config = MapConfig::default();
        apply_env(&mut config, env(&[])).unwrap();
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let mut config = MapConfig::default();
        apply_env(
            &mut config,
            env(&[
                (ENV_CLUSTER_RADIUS, "40"),
                (ENV_CLUSTER_MAX_ZOOM, "12"),
                (ENV_CLUSTER_MIN_POINTS, "3"),
                (ENV_EASE_MS, " 250 "),
                (ENV_VIEWPORT, "800x600"),
            ]),
        )
        .unwrap();
        assert_eq!(config.cluster.radius_px, 40.0);
        assert_eq!(config.cluster.max_zoom, 12);
        assert_eq!(config.cluster.min_points, 3);
        assert_eq!(config.ease_duration_ms, 250);
        assert_eq!(config.viewport_px, [800.0, 600.0]);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let mut config = MapConfig::default();
        let err = apply_env(&mut config, env(&[(ENV_CLUSTER_MAX_ZOOM, "fourteen")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Env {
                key: ENV_CLUSTER_MAX_ZOOM,
                value: "fourteen".to_string(),
            }
        );

        let err = apply_env(&mut config, env(&[(ENV_VIEWPORT, "wide")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: ENV_VIEWPORT, .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load(Some(Path::new("/nonexistent/memorial.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
