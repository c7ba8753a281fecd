//! Occupancy grid and the obstacle layouts that populate it.

use crate::models::{GeoPoint, GridCell};
use crate::spatial::project_to_cell;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A straight wall of blocked cells. Ranges are half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WallSegment {
    /// Blocks `col` for every row in `row_start..row_end`.
    Vertical {
        col: i32,
        row_start: i32,
        row_end: i32,
    },
    /// Blocks `row` for every column in `col_start..col_end`.
    Horizontal {
        row: i32,
        col_start: i32,
        col_end: i32,
    },
}

impl WallSegment {
    /// Cells of this wall that fall inside a `rows` x `cols` grid.
    ///
    /// The range is intersected with the grid before iterating, so a wall with huge
    /// endpoints costs no more than one that stops at the border.
    fn cells_within(&self, rows: usize, cols: usize) -> impl Iterator<Item = GridCell> {
        let rows = i32::try_from(rows).unwrap_or(i32::MAX);
        let cols = i32::try_from(cols).unwrap_or(i32::MAX);
        let (fixed, fixed_limit, start, end, span_limit, vertical) = match *self {
            WallSegment::Vertical {
                col,
                row_start,
                row_end,
            } => (col, cols, row_start, row_end, rows, true),
            WallSegment::Horizontal {
                row,
                col_start,
                col_end,
            } => (row, rows, col_start, col_end, cols, false),
        };
        let span = if (0..fixed_limit).contains(&fixed) {
            start.max(0)..end.min(span_limit)
        } else {
            0..0
        };
        span.map(move |i| {
            if vertical {
                GridCell::new(i, fixed)
            } else {
                GridCell::new(fixed, i)
            }
        })
    }
}

/// Static obstacles applied once when a grid is built.
///
/// Cells outside the grid are clipped, so one layout can be reused across grid sizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleLayout {
    #[serde(default)]
    pub blocked_cells: Vec<GridCell>,
    #[serde(default)]
    pub walls: Vec<WallSegment>,
}

impl ObstacleLayout {
    /// Layout with no obstacles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Layout blocking exactly the given cells.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = GridCell>,
    {
        Self {
            blocked_cells: cells.into_iter().collect(),
            walls: Vec::new(),
        }
    }

    /// The placeholder field map: a vertical wall on column 2 (rows 3..8) crossed by a
    /// horizontal wall on row 6 (columns 4..9).
    pub fn reference() -> Self {
        Self {
            blocked_cells: Vec::new(),
            walls: vec![
                WallSegment::Vertical {
                    col: 2,
                    row_start: 3,
                    row_end: 8,
                },
                WallSegment::Horizontal {
                    row: 6,
                    col_start: 4,
                    col_end: 9,
                },
            ],
        }
    }

    pub fn with_wall(mut self, wall: WallSegment) -> Self {
        self.walls.push(wall);
        self
    }

    /// Every cell this layout blocks inside a `rows` x `cols` grid.
    pub fn cells_within(&self, rows: usize, cols: usize) -> impl Iterator<Item = GridCell> + '_ {
        let in_bounds = move |cell: &GridCell| {
            cell.row >= 0
                && cell.col >= 0
                && (cell.row as usize) < rows
                && (cell.col as usize) < cols
        };
        self.blocked_cells
            .iter()
            .copied()
            .filter(in_bounds)
            .chain(
                self.walls
                    .iter()
                    .flat_map(move |wall| wall.cells_within(rows, cols)),
            )
    }
}

/// Largest row or column count a grid accepts; cell indices are `i32`.
pub const MAX_DIMENSION: usize = i32::MAX as usize;

/// Fixed-size boolean occupancy grid anchored at a geodetic origin.
///
/// Storage is a single row-major arena; `true` marks a blocked cell. Dimensions and
/// contents never change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    origin: GeoPoint,
    cell_size_m: f64,
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Build a grid and apply `layout` to it.
    ///
    /// Zero dimensions produce an empty grid; the planner refuses to search it. So do
    /// dimensions beyond [`MAX_DIMENSION`] or whose product overflows `usize`.
    pub fn new(
        origin: GeoPoint,
        cell_size_m: f64,
        rows: usize,
        cols: usize,
        layout: &ObstacleLayout,
    ) -> Self {
        let (rows, cols) = match checked_area(rows, cols) {
            Some(_) => (rows, cols),
            None => {
                warn!(rows, cols, "grid dimensions out of range, building an empty grid");
                (0, 0)
            }
        };
        let mut grid = Self {
            origin,
            cell_size_m,
            rows,
            cols,
            cells: vec![false; rows * cols],
        };
        for cell in layout.cells_within(rows, cols) {
            if let Some(idx) = grid.index(&cell) {
                grid.cells[idx] = true;
            }
        }
        grid
    }

    /// Build a grid from a nested boolean matrix, `matrix[row][col]`.
    ///
    /// Ragged rows are truncated to the shortest row length.
    pub fn from_matrix(origin: GeoPoint, cell_size_m: f64, matrix: &[Vec<bool>]) -> Self {
        let rows = matrix.len();
        let cols = matrix.iter().map(Vec::len).min().unwrap_or(0);
        let cells = matrix
            .iter()
            .flat_map(|row| row.iter().take(cols).copied())
            .collect();
        Self {
            origin,
            cell_size_m,
            rows,
            cols,
            cells,
        }
    }

    pub fn origin(&self) -> &GeoPoint {
        &self.origin
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn is_in_bounds(&self, cell: &GridCell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as usize) < self.rows
            && (cell.col as usize) < self.cols
    }

    /// True for in-bounds blocked cells. Out-of-bounds cells report `false`.
    pub fn is_blocked(&self, cell: &GridCell) -> bool {
        self.index(cell).map(|idx| self.cells[idx]).unwrap_or(false)
    }

    /// In bounds and free.
    pub fn is_traversable(&self, cell: &GridCell) -> bool {
        self.index(cell).map(|idx| !self.cells[idx]).unwrap_or(false)
    }

    /// Row-major view of the whole matrix.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> Option<&[bool]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.cells[start..start + self.cols])
    }

    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|blocked| **blocked).count()
    }

    /// Project a geodetic point into this grid.
    pub fn project(&self, point: &GeoPoint) -> Option<GridCell> {
        project_to_cell(&self.origin, point, self.cell_size_m, self.rows, self.cols)
    }

    /// Row-major arena index of `cell`, or `None` when it is out of bounds.
    pub(crate) fn index(&self, cell: &GridCell) -> Option<usize> {
        if !self.is_in_bounds(cell) {
            return None;
        }
        Some(cell.row as usize * self.cols + cell.col as usize)
    }
}

/// Cell count of a `rows` x `cols` grid, or `None` if either side exceeds
/// [`MAX_DIMENSION`] or the product overflows.
pub fn checked_area(rows: usize, cols: usize) -> Option<usize> {
    if rows > MAX_DIMENSION || cols > MAX_DIMENSION {
        return None;
    }
    rows.checked_mul(cols)
}

impl fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Grid map ({}x{}), 1=obstacle:",
            self.rows, self.cols
        )?;
        for row in self.cells.chunks(self.cols.max(1)).take(self.rows) {
            let line: Vec<&str> = row
                .iter()
                .map(|blocked| if *blocked { "1" } else { "0" })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
