//! Geodetic grid projection, occupancy grids and 8-connected A* planning for a ground robot.

pub mod config;
pub mod grid;
pub mod models;
pub mod odometry;
pub mod planner;
pub mod spatial;
pub mod ublox;

pub use config::{ConfigError, MotionConfig, NavConfig};
pub use grid::{ObstacleLayout, OccupancyGrid, WallSegment, MAX_DIMENSION};
pub use models::{GeoPoint, GridCell, MotionCommand};
pub use odometry::Odometry;
pub use planner::{
    octile_distance, path_cost, plan, plan_detailed, PlanFailure, PlanResult, MOVES,
};
pub use spatial::{great_circle_m, project_to_cell};
pub use ublox::{read_fix_file, NavPosLlh, UbxError};
