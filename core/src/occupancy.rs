//! Read-only occupancy grid view and the line-of-sight oracle built on it.

use glam::Vec2;

use crate::CellCoord;

/// Read-only view into a dense walkable/blocked grid.
///
/// Cells are stored in row-major order; `true` marks a blocked cell. Every
/// coordinate outside `[0, columns) x [0, rows)` is reported as blocked.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    blocked: &'a [bool],
    columns: u32,
    rows: u32,
    cell_size: f32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided cell slice.
    #[must_use]
    pub fn new(blocked: &'a [bool], columns: u32, rows: u32, cell_size: f32) -> Self {
        Self {
            blocked,
            columns,
            rows,
            cell_size,
        }
    }

    /// Provides the dimensions of the underlying grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether the cell lies inside the grid and is not blocked.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.blocked.get(index).copied())
            .map_or(false, |blocked| !blocked)
    }

    /// Cell containing the provided world point, which may lie outside the grid.
    #[must_use]
    pub fn cell_at(&self, point: Vec2) -> CellCoord {
        CellCoord::new(
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// World-space center of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.cell_size,
            (cell.row() as f32 + 0.5) * self.cell_size,
        )
    }

    /// Iterator over every blocked cell in row-major order.
    pub fn blocked_cells(&self) -> impl Iterator<Item = CellCoord> + 'a {
        let columns = self.columns.max(1) as usize;
        let blocked: &'a [bool] = self.blocked;
        blocked
            .iter()
            .enumerate()
            .filter(|(_, blocked)| **blocked)
            .map(move |(index, _)| {
                CellCoord::new((index % columns) as i32, (index / columns) as i32)
            })
    }

    /// Reports whether a straight segment between two world points only crosses walkable cells.
    #[must_use]
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        self.cells_visible(self.cell_at(from), self.cell_at(to))
    }

    /// Rasterizes the digital line between two cells and reports whether every visited cell,
    /// both endpoints included, is walkable.
    #[must_use]
    pub fn cells_visible(&self, from: CellCoord, to: CellCoord) -> bool {
        let (mut column, mut row) = (i64::from(from.column()), i64::from(from.row()));
        let (end_column, end_row) = (i64::from(to.column()), i64::from(to.row()));

        let dx = (end_column - column).abs();
        let dy = (end_row - row).abs();
        let step_column = if column < end_column { 1 } else { -1 };
        let step_row = if row < end_row { 1 } else { -1 };
        let mut error = dx - dy;

        loop {
            if !self.is_walkable_wide(column, row) {
                return false;
            }
            if column == end_column && row == end_row {
                return true;
            }

            let doubled = 2 * error;
            if doubled > -dy {
                error -= dy;
                column += step_column;
            }
            if doubled < dx {
                error += dx;
                row += step_row;
            }
        }
    }

    /// Row-major index of the cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        usize::try_from(row)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(column).ok()?)
    }

    fn is_walkable_wide(&self, column: i64, row: i64) -> bool {
        match (i32::try_from(column), i32::try_from(row)) {
            (Ok(column), Ok(row)) => self.is_walkable(CellCoord::new(column, row)),
            _ => false,
        }
    }
}
