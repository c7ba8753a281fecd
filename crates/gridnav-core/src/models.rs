//! Core data models shared by the projector, grid and planner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A geodetic fix as produced by the GPS decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Ellipsoid height in meters, when the source provides one
    #[serde(default)]
    pub altitude_m: Option<f64>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m: None,
        }
    }

    pub fn with_altitude(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m: Some(altitude_m),
        }
    }

    /// True when both latitude and longitude truncate to zero.
    ///
    /// Recorded data uses an all-zero fix to mark a frame that failed to decode, so callers
    /// must reject such fixes before projecting them.
    pub fn is_unset(&self) -> bool {
        self.lat.trunc() as i64 == 0 && self.lon.trunc() as i64 == 0
    }
}

/// A cell index in the occupancy grid.
///
/// Rows grow northward and columns grow eastward from the grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

impl GridCell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Offset this cell by a (row, col) delta.
    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// Euclidean distance between two cell indices, in cells.
    pub fn distance_to(&self, other: &GridCell) -> f64 {
        let d_row = f64::from(self.row - other.row);
        let d_col = f64::from(self.col - other.col);
        (d_row * d_row + d_col * d_col).sqrt()
    }

    /// True when `other` is one of the eight cells surrounding this one.
    pub fn is_adjacent(&self, other: &GridCell) -> bool {
        let d_row = (self.row - other.row).abs();
        let d_col = (self.col - other.col).abs();
        d_row <= 1 && d_col <= 1 && (d_row, d_col) != (0, 0)
    }
}

impl From<(i32, i32)> for GridCell {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Motion the robot has to execute to follow a planned path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Total travelled distance in meters
    pub distance_m: f64,
    /// Drive time at the configured wheel speed, in seconds
    pub time_s: f64,
    /// Cumulative absolute rotation in degrees
    pub rotation_deg: f64,
}
