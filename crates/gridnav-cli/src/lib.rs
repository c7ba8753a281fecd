//! Route pipeline shared by the `gridnav` binary: fixes in, motion commands out.

use anyhow::{bail, Context, Result};
use gridnav_core::{
    great_circle_m, plan_detailed, GeoPoint, GridCell, MotionCommand, NavConfig, PlanFailure,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Everything computed for one start/goal pair.
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub origin: GeoPoint,
    pub start_fix: GeoPoint,
    pub goal_fix: GeoPoint,
    /// Great-circle distance between the two fixes
    pub fix_separation_m: f64,
    pub start_cell: GridCell,
    pub goal_cell: GridCell,
    pub path: Vec<GridCell>,
    pub cost: f64,
    pub nodes_expanded: usize,
    pub failure: Option<PlanFailure>,
    pub command: MotionCommand,
}

impl RouteReport {
    /// Path rendered as `(r,c) (r,c) ...`.
    pub fn path_line(&self) -> String {
        let mut line = String::new();
        for (i, cell) in self.path.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            let _ = write!(line, "{cell}");
        }
        line
    }
}

/// Project both fixes onto the configured grid, plan between them and derive drive commands.
///
/// An unreachable goal is not an error: the report carries an empty path and zero motion.
pub fn run_pipeline(start: GeoPoint, goal: GeoPoint, config: &NavConfig) -> Result<RouteReport> {
    if start.is_unset() || goal.is_unset() {
        bail!("invalid GPS coordinates: start {start:?}, goal {goal:?}");
    }
    config.validate().context("invalid navigation config")?;

    let grid = config.build_grid(start);
    let origin = *grid.origin();
    let fix_separation_m = great_circle_m(&start, &goal);

    let Some(start_cell) = grid.project(&start) else {
        bail!(
            "start fix ({}, {}) falls outside the {}x{} grid",
            start.lat,
            start.lon,
            grid.rows(),
            grid.cols()
        );
    };
    let Some(goal_cell) = grid.project(&goal) else {
        bail!(
            "goal fix ({}, {}) falls outside the {}x{} grid",
            goal.lat,
            goal.lon,
            grid.rows(),
            grid.cols()
        );
    };

    let result = plan_detailed(&grid, start_cell, goal_cell);
    if let Some(failure) = result.failure {
        warn!(%start_cell, %goal_cell, reason = failure.describe(), "no route");
    }

    let command = config
        .motion
        .odometry()
        .compute_commands(&result.path, grid.cell_size_m());
    info!(
        fix_separation_m,
        cells = result.path.len(),
        distance_m = command.distance_m,
        time_s = command.time_s,
        rotation_deg = command.rotation_deg,
        "route planned"
    );

    Ok(RouteReport {
        origin,
        start_fix: start,
        goal_fix: goal,
        fix_separation_m,
        start_cell,
        goal_cell,
        path: result.path,
        cost: result.cost,
        nodes_expanded: result.nodes_expanded,
        failure: result.failure,
        command,
    })
}

/// Write drive time and total rotation on two lines.
pub fn write_commands(path: impl AsRef<Path>, command: &MotionCommand) -> Result<()> {
    let path = path.as_ref();
    let text = format!("{}\n{}\n", command.time_s, command.rotation_deg);
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}
