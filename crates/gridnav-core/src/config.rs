//! Grid and motion configuration, loaded from JSON and overridden from the environment.

use crate::grid::{checked_area, ObstacleLayout, OccupancyGrid};
use crate::models::GeoPoint;
use crate::odometry::Odometry;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_CELL_SIZE_M: &str = "GRIDNAV_CELL_SIZE_M";
pub const ENV_ROWS: &str = "GRIDNAV_ROWS";
pub const ENV_COLS: &str = "GRIDNAV_COLS";
pub const ENV_WHEEL_RADIUS_M: &str = "GRIDNAV_WHEEL_RADIUS_M";
pub const ENV_RPM: &str = "GRIDNAV_RPM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("environment variable {key}={value:?} is not a valid number")]
    InvalidEnv { key: &'static str, value: String },

    #[error("cell size must be a positive length, got {0}")]
    InvalidCellSize(f64),

    #[error("grid dimensions must be non-zero and at most 2147483647 per side, got {rows}x{cols}")]
    InvalidGridDimensions { rows: usize, cols: usize },

    #[error("motion profile must have positive wheel radius and rpm, got {wheel_radius_m} m at {rpm} rpm")]
    InvalidMotion { wheel_radius_m: f64, rpm: f64 },
}

/// Drive parameters of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub wheel_radius_m: f64,
    pub rpm: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            wheel_radius_m: 0.05,
            rpm: 120.0,
        }
    }
}

impl MotionConfig {
    pub fn odometry(&self) -> Odometry {
        Odometry::new(self.wheel_radius_m, self.rpm)
    }
}

/// Everything needed to build a grid and plan on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Grid origin; when unset the start fix is used
    pub origin: Option<GeoPoint>,
    pub cell_size_m: f64,
    pub rows: usize,
    pub cols: usize,
    pub layout: ObstacleLayout,
    pub motion: MotionConfig,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            origin: None,
            cell_size_m: 1.0,
            rows: 10,
            cols: 10,
            layout: ObstacleLayout::reference(),
            motion: MotionConfig::default(),
        }
    }
}

impl NavConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override numeric settings from `GRIDNAV_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Override numeric settings using `lookup` to resolve variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, ENV_CELL_SIZE_M)? {
            self.cell_size_m = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_ROWS)? {
            self.rows = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_COLS)? {
            self.cols = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_WHEEL_RADIUS_M)? {
            self.motion.wheel_radius_m = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_RPM)? {
            self.motion.rpm = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size_m.is_finite() && self.cell_size_m > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size_m));
        }
        if self.rows == 0 || self.cols == 0 || checked_area(self.rows, self.cols).is_none() {
            return Err(ConfigError::InvalidGridDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let MotionConfig {
            wheel_radius_m,
            rpm,
        } = self.motion;
        if !(wheel_radius_m > 0.0 && rpm > 0.0) {
            return Err(ConfigError::InvalidMotion {
                wheel_radius_m,
                rpm,
            });
        }
        Ok(())
    }

    /// Build the occupancy grid, anchored at the configured origin or at `fallback_origin`.
    pub fn build_grid(&self, fallback_origin: GeoPoint) -> OccupancyGrid {
        OccupancyGrid::new(
            self.origin.unwrap_or(fallback_origin),
            self.cell_size_m,
            self.rows,
            self.cols,
            &self.layout,
        )
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridCell;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_field_setup() {
        let config = NavConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.rows, config.cols), (10, 10));
        assert_eq!(config.layout, ObstacleLayout::reference());
        assert!(config.origin.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = NavConfig::from_json_str(
            r#"{ "rows": 5, "cols": 6, "layout": { "blocked_cells": [{"row": 1, "col": 1}] } }"#,
        )
        .expect("valid config");
        assert_eq!((config.rows, config.cols), (5, 6));
        assert_eq!(config.cell_size_m, 1.0);
        assert_eq!(config.motion, MotionConfig::default());

        let grid = config.build_grid(GeoPoint::new(33.0, -117.0));
        assert_eq!(grid.blocked_count(), 1);
        assert!(grid.is_blocked(&GridCell::new(1, 1)));
        assert_eq!(grid.origin(), &GeoPoint::new(33.0, -117.0));
    }

    #[test]
    fn configured_origin_wins_over_fallback() {
        let config = NavConfig {
            origin: Some(GeoPoint::new(1.5, 2.5)),
            ..NavConfig::default()
        };
        let grid = config.build_grid(GeoPoint::new(33.0, -117.0));
        assert_eq!(grid.origin(), &GeoPoint::new(1.5, 2.5));
    }

    #[test]
    fn overrides_replace_numeric_settings() {
        let vars: HashMap<&str, &str> = [(ENV_ROWS, "20"), (ENV_CELL_SIZE_M, " 0.5 "), (ENV_RPM, "60")]
            .into_iter()
            .collect();
        let mut config = NavConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .expect("valid overrides");
        assert_eq!(config.rows, 20);
        assert_eq!(config.cols, 10);
        assert_eq!(config.cell_size_m, 0.5);
        assert_eq!(config.motion.rpm, 60.0);
    }

    #[test]
    fn oversized_env_dimensions_fail_validation() {
        let mut config = NavConfig::default();
        config
            .apply_overrides(|key| (key == ENV_ROWS).then(|| "9223372036854775808".to_string()))
            .expect("parses as usize");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGridDimensions { cols: 10, .. })
        ));
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = NavConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_COLS).then(|| "ten".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENV_COLS, .. }));
    }

    #[test]
    fn validation_rejects_degenerate_settings() {
        let zero_rows = NavConfig {
            rows: 0,
            ..NavConfig::default()
        };
        assert!(matches!(
            zero_rows.validate(),
            Err(ConfigError::InvalidGridDimensions { rows: 0, cols: 10 })
        ));

        let overflowing = NavConfig {
            rows: usize::MAX / 2 + 1,
            cols: 2,
            ..NavConfig::default()
        };
        assert!(matches!(
            overflowing.validate(),
            Err(ConfigError::InvalidGridDimensions { .. })
        ));

        let too_tall = NavConfig {
            rows: i32::MAX as usize + 1,
            cols: 1,
            ..NavConfig::default()
        };
        assert!(too_tall.validate().is_err());

        let bad_cell = NavConfig {
            cell_size_m: -1.0,
            ..NavConfig::default()
        };
        assert!(matches!(bad_cell.validate(), Err(ConfigError::InvalidCellSize(_))));

        let stalled = NavConfig {
            motion: MotionConfig {
                wheel_radius_m: 0.05,
                rpm: 0.0,
            },
            ..NavConfig::default()
        };
        assert!(matches!(stalled.validate(), Err(ConfigError::InvalidMotion { .. })));
    }
}
