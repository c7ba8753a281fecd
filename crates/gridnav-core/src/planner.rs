//! 8-connected A* search over an [`OccupancyGrid`].
//!
//! Axis-aligned moves cost 1.0 and diagonal moves cost √2; the heuristic is the Euclidean
//! distance to the goal, which is admissible and consistent for that cost model, so the
//! first time the goal is popped its path is optimal.
//!
//! # Tie-breaking
//!
//! Open-set entries are ordered by `f = g + h` and, for equal `f`, by insertion order
//! (first pushed, first popped). Neighbours are pushed in the order of [`MOVES`]. Together
//! these fix which of several equal-cost paths is returned.

use crate::grid::OccupancyGrid;
use crate::models::GridCell;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;
use tracing::{debug, warn};

/// Neighbour offsets as (row delta, col delta, move cost), in expansion order.
pub const MOVES: [(i32, i32, f64); 8] = [
    (-1, -1, SQRT_2),
    (-1, 0, 1.0),
    (-1, 1, SQRT_2),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (1, -1, SQRT_2),
    (1, 0, 1.0),
    (1, 1, SQRT_2),
];

/// Why a search produced no path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFailure {
    /// Grid has zero rows or zero columns
    InvalidGridDimensions,
    StartOutOfBounds,
    GoalOutOfBounds,
    StartBlocked,
    GoalBlocked,
    /// The open set emptied before the goal was reached
    Unreachable,
}

impl PlanFailure {
    pub fn describe(&self) -> &'static str {
        match self {
            PlanFailure::InvalidGridDimensions => "grid has zero rows or columns",
            PlanFailure::StartOutOfBounds => "start cell is outside the grid",
            PlanFailure::GoalOutOfBounds => "goal cell is outside the grid",
            PlanFailure::StartBlocked => "start cell is blocked",
            PlanFailure::GoalBlocked => "goal cell is blocked",
            PlanFailure::Unreachable => "no path between start and goal",
        }
    }
}

/// Outcome of a single search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Cells from start to goal inclusive; empty on failure
    pub path: Vec<GridCell>,
    /// Sum of move costs along `path`
    pub cost: f64,
    /// Number of cells popped and expanded
    pub nodes_expanded: usize,
    pub failure: Option<PlanFailure>,
}

impl PlanResult {
    fn failed(failure: PlanFailure, nodes_expanded: usize) -> Self {
        Self {
            path: Vec::new(),
            cost: 0.0,
            nodes_expanded,
            failure: Some(failure),
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    seq: u64,
    idx: usize,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Wrapped in `Reverse`, so the smallest f (then the oldest entry) pops first.
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Plan a path from `start` to `goal`, returning an empty path when none exists.
pub fn plan(grid: &OccupancyGrid, start: GridCell, goal: GridCell) -> Vec<GridCell> {
    plan_detailed(grid, start, goal).path
}

/// Plan a path and report cost, search effort and the failure reason.
pub fn plan_detailed(grid: &OccupancyGrid, start: GridCell, goal: GridCell) -> PlanResult {
    if let Some(failure) = check_endpoints(grid, &start, &goal) {
        warn!(%start, %goal, reason = failure.describe(), "rejecting plan request");
        return PlanResult::failed(failure, 0);
    }

    if start == goal {
        return PlanResult {
            path: vec![start],
            cost: 0.0,
            nodes_expanded: 0,
            failure: None,
        };
    }

    let rows = grid.rows();
    let cols = grid.cols();
    let cell_at = |idx: usize| GridCell::new((idx / cols) as i32, (idx % cols) as i32);

    let mut g_score = vec![f64::INFINITY; rows * cols];
    let mut came_from: Vec<Option<usize>> = vec![None; rows * cols];
    let mut closed = vec![false; rows * cols];
    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut seq = 0u64;

    // Endpoints were validated above
    let (Some(start_idx), Some(goal_idx)) = (grid.index(&start), grid.index(&goal)) else {
        return PlanResult::failed(PlanFailure::InvalidGridDimensions, 0);
    };

    g_score[start_idx] = 0.0;
    open_set.push(Reverse(OpenNode {
        f_score: FloatOrd(heuristic(&start, &goal)),
        seq,
        idx: start_idx,
    }));

    let mut nodes_expanded = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed[current.idx] {
            continue;
        }
        closed[current.idx] = true;
        nodes_expanded += 1;

        if current.idx == goal_idx {
            let path = reconstruct(&came_from, goal_idx, cell_at);
            let cost = g_score[goal_idx];
            debug!(
                %start,
                %goal,
                cells = path.len(),
                cost,
                nodes_expanded,
                "path found"
            );
            return PlanResult {
                path,
                cost,
                nodes_expanded,
                failure: None,
            };
        }

        let cell = cell_at(current.idx);
        let current_g = g_score[current.idx];

        for (d_row, d_col, step_cost) in MOVES {
            let next = cell.offset(d_row, d_col);
            if !grid.is_traversable(&next) {
                continue;
            }
            let Some(next_idx) = grid.index(&next) else {
                continue;
            };
            if closed[next_idx] {
                continue;
            }

            let tentative_g = current_g + step_cost;
            if tentative_g < g_score[next_idx] {
                came_from[next_idx] = Some(current.idx);
                g_score[next_idx] = tentative_g;
                seq += 1;
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative_g + heuristic(&next, &goal)),
                    seq,
                    idx: next_idx,
                }));
            }
        }
    }

    debug!(%start, %goal, nodes_expanded, "open set exhausted");
    PlanResult::failed(PlanFailure::Unreachable, nodes_expanded)
}

/// Total move cost of a path, or `None` if two consecutive cells are not adjacent.
pub fn path_cost(path: &[GridCell]) -> Option<f64> {
    path.windows(2).try_fold(0.0, |acc, pair| {
        if !pair[0].is_adjacent(&pair[1]) {
            return None;
        }
        Some(acc + pair[0].distance_to(&pair[1]))
    })
}

/// Cost of the cheapest path between two cells on an obstacle-free grid.
pub fn octile_distance(a: &GridCell, b: &GridCell) -> f64 {
    let d_row = f64::from((a.row - b.row).abs());
    let d_col = f64::from((a.col - b.col).abs());
    let diagonal = d_row.min(d_col);
    SQRT_2 * diagonal + (d_row.max(d_col) - diagonal)
}

fn heuristic(cell: &GridCell, goal: &GridCell) -> f64 {
    cell.distance_to(goal)
}

fn check_endpoints(grid: &OccupancyGrid, start: &GridCell, goal: &GridCell) -> Option<PlanFailure> {
    if grid.is_empty() {
        return Some(PlanFailure::InvalidGridDimensions);
    }
    if !grid.is_in_bounds(start) {
        return Some(PlanFailure::StartOutOfBounds);
    }
    if !grid.is_in_bounds(goal) {
        return Some(PlanFailure::GoalOutOfBounds);
    }
    if grid.is_blocked(start) {
        return Some(PlanFailure::StartBlocked);
    }
    if grid.is_blocked(goal) {
        return Some(PlanFailure::GoalBlocked);
    }
    None
}

fn reconstruct<F>(came_from: &[Option<usize>], goal_idx: usize, cell_at: F) -> Vec<GridCell>
where
    F: Fn(usize) -> GridCell,
{
    let mut path = Vec::new();
    let mut current = Some(goal_idx);
    while let Some(idx) = current {
        path.push(cell_at(idx));
        current = came_from[idx];
    }
    path.reverse();
    path
}
