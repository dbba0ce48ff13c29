//! Occupancy grid builder used by the world crate.

use std::collections::BTreeSet;

use gridwalk_core::{Aabb, Category, InstanceId, InstanceSnapshot, OccupancyView};

/// Dense walkable/blocked grid covering the playfield.
///
/// The grid is rebuilt from scratch for every planning request; there is no
/// incremental update. Cells default to walkable and `true` marks a blocked
/// cell, stored in row-major order.
#[derive(Clone, Debug, Default)]
pub(crate) struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    blocked: Vec<bool>,
}

impl OccupancyGrid {
    /// Discards the current contents and allocates an all-walkable grid.
    pub(crate) fn reset(&mut self, columns: u32, rows: u32, cell_size: f32) {
        let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);

        self.columns = columns;
        self.rows = rows;
        self.cell_size = cell_size;
        if self.blocked.len() != cell_count {
            self.blocked = vec![false; cell_count];
        } else {
            self.blocked.fill(false);
        }
    }

    /// Rebuilds the grid, blocking every cell touched by a qualifying obstacle.
    ///
    /// An instance qualifies when it is active, its category is registered,
    /// and it is not the `excluded` instance representing the requesting agent.
    pub(crate) fn rebuild_with<'a, I>(
        &mut self,
        columns: u32,
        rows: u32,
        cell_size: f32,
        instances: I,
        categories: &BTreeSet<Category>,
        excluded: Option<InstanceId>,
    ) where
        I: IntoIterator<Item = &'a InstanceSnapshot>,
    {
        self.reset(columns, rows, cell_size);

        for instance in instances {
            if !instance.active || Some(instance.id) == excluded {
                continue;
            }
            if !categories.contains(&instance.category) {
                continue;
            }
            self.mark_blocked(&instance.bounds);
        }
    }

    /// Read-only view used by planners and debug overlays.
    pub(crate) fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.blocked, self.columns, self.rows, self.cell_size)
    }

    fn mark_blocked(&mut self, bounds: &Aabb) {
        if self.columns == 0 || self.rows == 0 {
            return;
        }

        let Some((first_column, last_column)) =
            cell_span(bounds.min().x, bounds.max().x, self.cell_size, self.columns)
        else {
            return;
        };
        let Some((first_row, last_row)) =
            cell_span(bounds.min().y, bounds.max().y, self.cell_size, self.rows)
        else {
            return;
        };

        let width = self.columns as usize;
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                if let Some(slot) = self.blocked.get_mut(row as usize * width + column as usize) {
                    *slot = true;
                }
            }
        }
    }
}

/// Inclusive range of cells covered by `[min, max)` along one axis, clamped to the grid.
///
/// Both edges are floor-divided by the cell size. A max edge that lands exactly
/// on a cell boundary belongs to the next cell and is excluded, so an obstacle
/// spanning whole cells blocks exactly those cells. Degenerate extents still
/// block the cell containing them.
fn cell_span(min: f32, max: f32, cell_size: f32, count: u32) -> Option<(u32, u32)> {
    let first = (min / cell_size).floor();
    let mut last = (max / cell_size).floor();
    if max > min && (max / cell_size).fract() == 0.0 {
        last -= 1.0;
    }
    let last = last.max(first);

    let limit = count as f32 - 1.0;
    if last < 0.0 || first > limit {
        return None;
    }

    Some((first.max(0.0) as u32, last.min(limit) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::{CellCoord, Vec2};

    fn obstacle(id: u32, category: u32, min: (f32, f32), max: (f32, f32)) -> InstanceSnapshot {
        InstanceSnapshot {
            id: InstanceId::new(id),
            category: Category::new(category),
            bounds: Aabb::from_corners(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1)),
            active: true,
        }
    }

    fn categories(values: &[u32]) -> BTreeSet<Category> {
        values.iter().copied().map(Category::new).collect()
    }

    #[test]
    fn exact_cell_spans_block_exactly_those_cells() {
        let mut grid = OccupancyGrid::default();
        let wall = obstacle(1, 1, (64.0, 0.0), (96.0, 128.0));

        grid.rebuild_with(5, 5, 32.0, [&wall], &categories(&[1]), None);

        let blocked: Vec<_> = grid.view().blocked_cells().collect();
        assert_eq!(
            blocked,
            vec![
                CellCoord::new(2, 0),
                CellCoord::new(2, 1),
                CellCoord::new(2, 2),
                CellCoord::new(2, 3)
            ]
        );
    }

    #[test]
    fn partial_overlap_blocks_every_touched_cell() {
        let mut grid = OccupancyGrid::default();
        let crate_box = obstacle(1, 1, (20.0, 20.0), (40.0, 40.0));

        grid.rebuild_with(3, 3, 32.0, [&crate_box], &categories(&[1]), None);

        let view = grid.view();
        for cell in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(!view.is_walkable(CellCoord::new(cell.0, cell.1)));
        }
        assert!(view.is_walkable(CellCoord::new(2, 2)));
    }

    #[test]
    fn obstacles_are_clamped_to_the_grid() {
        let mut grid = OccupancyGrid::default();
        let oversized = obstacle(1, 1, (-100.0, 70.0), (1_000.0, 80.0));
        let outside = obstacle(2, 1, (200.0, 200.0), (260.0, 260.0));

        grid.rebuild_with(4, 4, 32.0, [&oversized, &outside], &categories(&[1]), None);

        let blocked: Vec<_> = grid.view().blocked_cells().collect();
        assert_eq!(blocked.len(), 4);
        assert!(blocked.iter().all(|cell| cell.row() == 2));
    }

    #[test]
    fn filters_inactive_unregistered_and_excluded_instances() {
        let mut grid = OccupancyGrid::default();
        let mut inactive = obstacle(1, 1, (0.0, 0.0), (10.0, 10.0));
        inactive.active = false;
        let unregistered = obstacle(2, 7, (32.0, 0.0), (40.0, 10.0));
        let own_body = obstacle(3, 1, (64.0, 0.0), (70.0, 10.0));
        let wall = obstacle(4, 1, (96.0, 0.0), (100.0, 10.0));

        grid.rebuild_with(
            4,
            1,
            32.0,
            [&inactive, &unregistered, &own_body, &wall],
            &categories(&[1]),
            Some(InstanceId::new(3)),
        );

        let blocked: Vec<_> = grid.view().blocked_cells().collect();
        assert_eq!(blocked, vec![CellCoord::new(3, 0)]);
    }

    #[test]
    fn rebuild_discards_previous_obstacles() {
        let mut grid = OccupancyGrid::default();
        let wall = obstacle(1, 1, (0.0, 0.0), (32.0, 32.0));
        let registered = categories(&[1]);

        grid.rebuild_with(2, 2, 32.0, [&wall], &registered, None);
        assert_eq!(grid.view().blocked_cells().count(), 1);

        grid.rebuild_with(2, 2, 32.0, std::iter::empty(), &registered, None);
        assert_eq!(grid.view().blocked_cells().count(), 0);
    }
}
