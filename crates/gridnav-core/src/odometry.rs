//! Converts a planned cell path into drive distance, time and rotation.
//!
//! Headings are compass-style: 0° points along +row (north) and 90° along +col (east).
//! The robot is assumed to start facing 0°.

use crate::models::{GridCell, MotionCommand};
use std::f64::consts::PI;

/// Wheel-driven robot that moves at a constant linear speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Odometry {
    wheel_radius_m: f64,
    rpm: f64,
    linear_velocity_mps: f64,
}

impl Odometry {
    pub fn new(wheel_radius_m: f64, rpm: f64) -> Self {
        let revs_per_sec = rpm / 60.0;
        Self {
            wheel_radius_m,
            rpm,
            linear_velocity_mps: 2.0 * PI * wheel_radius_m * revs_per_sec,
        }
    }

    pub fn wheel_radius_m(&self) -> f64 {
        self.wheel_radius_m
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn linear_velocity_mps(&self) -> f64 {
        self.linear_velocity_mps
    }

    /// Distance, time and cumulative turning needed to drive `path`.
    ///
    /// Paths with fewer than two cells, or a robot that cannot move, yield all zeros.
    pub fn compute_commands(&self, path: &[GridCell], cell_size_m: f64) -> MotionCommand {
        if path.len() < 2 || self.linear_velocity_mps <= 0.0 {
            return MotionCommand::default();
        }

        let distance_m: f64 = path
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum::<f64>()
            * cell_size_m;

        let headings: Vec<f64> = path
            .windows(2)
            .map(|pair| heading_deg(&pair[0], &pair[1]))
            .collect();

        // Initial turn from the 0° start heading, then every change between segments.
        let mut rotation_deg = normalize_180(headings[0]).abs();
        for pair in headings.windows(2) {
            rotation_deg += normalize_180(pair[1] - pair[0]).abs();
        }

        MotionCommand {
            distance_m,
            time_s: distance_m / self.linear_velocity_mps,
            rotation_deg,
        }
    }
}

/// Heading of the segment `from -> to` in degrees, in (-180, 180].
pub fn heading_deg(from: &GridCell, to: &GridCell) -> f64 {
    let d_row = f64::from(to.row - from.row);
    let d_col = f64::from(to.col - from.col);
    d_col.atan2(d_row).to_degrees()
}

/// Wrap an angle into (-180, 180].
pub fn normalize_180(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
