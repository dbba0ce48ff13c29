//! Best-first cell search used to find minimum-cost routes.

use std::{cmp::Ordering, collections::BinaryHeap};

use gridwalk_core::{CellCoord, OccupancyView, PlanError, DIAGONAL_STEP_COST, ORTHOGONAL_STEP_COST};

const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONAL_OFFSETS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Finds a minimum-cost sequence of adjacent walkable cells from `start` to `goal`.
///
/// The returned path includes both endpoints. Diagonal steps are only taken
/// when `allow_diagonal` is set and both orthogonal cells flanking the step
/// are walkable. The estimate toward the goal is the Manhattan distance in
/// both movement modes. The start cell's own occupancy is never checked so
/// an agent standing inside a stale obstacle can still leave it.
pub fn find_cell_path(
    view: &OccupancyView<'_>,
    start: CellCoord,
    goal: CellCoord,
    allow_diagonal: bool,
) -> Result<Vec<CellCoord>, PlanError> {
    let start_index = view.index(start).ok_or(PlanError::StartOutOfBounds)?;
    let goal_index = view.index(goal).ok_or(PlanError::GoalOutOfBounds)?;
    if !view.is_walkable(goal) {
        return Err(PlanError::GoalBlocked);
    }

    let (columns, rows) = view.dimensions();
    let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
    let mut workspace = Workspace::new(cell_count);
    workspace.open(start_index, 0.0, heuristic(start, goal));

    while let Some(entry) = workspace.frontier.pop() {
        if workspace.closed[entry.index] {
            continue;
        }
        workspace.closed[entry.index] = true;

        if entry.index == goal_index {
            return Ok(workspace.reconstruct(goal_index, columns));
        }

        let current = cell_at_index(entry.index, columns);
        let current_cost = workspace.cost[entry.index];

        for (neighbor, step_cost) in neighbors(view, current, allow_diagonal) {
            let Some(neighbor_index) = view.index(neighbor) else {
                continue;
            };
            if workspace.closed[neighbor_index] {
                continue;
            }

            let tentative = current_cost + step_cost;
            if tentative < workspace.cost[neighbor_index] {
                workspace.parent[neighbor_index] = Some(entry.index);
                workspace.open(neighbor_index, tentative, heuristic(neighbor, goal));
            }
        }
    }

    Err(PlanError::Unreachable)
}

fn heuristic(cell: CellCoord, goal: CellCoord) -> f32 {
    cell.manhattan_distance(goal) as f32
}

fn neighbors(
    view: &OccupancyView<'_>,
    cell: CellCoord,
    allow_diagonal: bool,
) -> impl Iterator<Item = (CellCoord, f32)> {
    let mut candidates = [None; 8];
    let mut count = 0;

    for (columns, rows) in ORTHOGONAL_OFFSETS {
        let neighbor = cell.offset(columns, rows);
        if view.is_walkable(neighbor) {
            candidates[count] = Some((neighbor, ORTHOGONAL_STEP_COST));
            count += 1;
        }
    }

    if allow_diagonal {
        for (columns, rows) in DIAGONAL_OFFSETS {
            let neighbor = cell.offset(columns, rows);
            if !view.is_walkable(neighbor) {
                continue;
            }
            // Both flanking orthogonal cells must be open to avoid cutting a corner.
            if !view.is_walkable(cell.offset(columns, 0)) || !view.is_walkable(cell.offset(0, rows))
            {
                continue;
            }
            candidates[count] = Some((neighbor, DIAGONAL_STEP_COST));
            count += 1;
        }
    }

    candidates.into_iter().take(count).flatten()
}

fn cell_at_index(index: usize, columns: u32) -> CellCoord {
    let width = columns.max(1) as usize;
    CellCoord::new((index % width) as i32, (index / width) as i32)
}

/// Transient per-call search state. Nothing here outlives a single search.
struct Workspace {
    cost: Vec<f32>,
    parent: Vec<Option<usize>>,
    closed: Vec<bool>,
    frontier: BinaryHeap<OpenEntry>,
    next_sequence: u64,
}

impl Workspace {
    fn new(cell_count: usize) -> Self {
        Self {
            cost: vec![f32::INFINITY; cell_count],
            parent: vec![None; cell_count],
            closed: vec![false; cell_count],
            frontier: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    fn open(&mut self, index: usize, cost: f32, heuristic: f32) {
        self.cost[index] = cost;
        self.frontier.push(OpenEntry {
            estimate: cost + heuristic,
            sequence: self.next_sequence,
            index,
        });
        self.next_sequence += 1;
    }

    fn reconstruct(&self, goal_index: usize, columns: u32) -> Vec<CellCoord> {
        let mut path = vec![cell_at_index(goal_index, columns)];
        let mut cursor = goal_index;
        while let Some(previous) = self.parent[cursor] {
            path.push(cell_at_index(previous, columns));
            cursor = previous;
        }
        path.reverse();
        path
    }
}

/// Frontier entry ordered so the heap pops the lowest estimate first and,
/// among equal estimates, the entry that was inserted first.
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    estimate: f32,
    sequence: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(columns: u32, rows: u32, blocked: &[(i32, i32)]) -> Vec<bool> {
        let mut cells = vec![false; (columns * rows) as usize];
        for &(column, row) in blocked {
            cells[(row as u32 * columns + column as u32) as usize] = true;
        }
        cells
    }

    #[test]
    fn straight_corridor_is_walked_cell_by_cell() {
        let cells = grid_with(5, 1, &[]);
        let view = OccupancyView::new(&cells, 5, 1, 1.0);
        let path = find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(4, 0), true)
            .expect("corridor is open");
        let columns: Vec<i32> = path.iter().map(CellCoord::column).collect();
        assert_eq!(columns, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn start_equal_to_goal_yields_single_cell() {
        let cells = grid_with(2, 2, &[]);
        let view = OccupancyView::new(&cells, 2, 2, 1.0);
        let path = find_cell_path(&view, CellCoord::new(1, 1), CellCoord::new(1, 1), false)
            .expect("trivial path");
        assert_eq!(path, vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn diagonal_steps_are_used_when_allowed() {
        let cells = grid_with(4, 4, &[]);
        let view = OccupancyView::new(&cells, 4, 4, 1.0);
        let path = find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(3, 3), true)
            .expect("open grid");
        assert_eq!(path.len(), 4);
        let orthogonal = find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(3, 3), false)
            .expect("open grid");
        assert_eq!(orthogonal.len(), 7);
    }

    #[test]
    fn diagonal_rejected_when_one_flank_is_blocked() {
        let cells = grid_with(2, 2, &[(1, 0)]);
        let view = OccupancyView::new(&cells, 2, 2, 1.0);
        let path = find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(1, 1), true)
            .expect("path around the corner");
        assert_eq!(
            path,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1)
            ]
        );
    }

    #[test]
    fn squeezing_between_blocked_corners_is_unreachable() {
        let cells = grid_with(2, 2, &[(1, 0), (0, 1)]);
        let view = OccupancyView::new(&cells, 2, 2, 1.0);
        assert_eq!(
            find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(1, 1), true),
            Err(PlanError::Unreachable)
        );
    }

    #[test]
    fn blocked_goal_fails_before_searching() {
        let cells = grid_with(3, 3, &[(2, 2)]);
        let view = OccupancyView::new(&cells, 3, 3, 1.0);
        assert_eq!(
            find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(2, 2), true),
            Err(PlanError::GoalBlocked)
        );
    }

    #[test]
    fn out_of_range_endpoints_fail() {
        let cells = grid_with(3, 3, &[]);
        let view = OccupancyView::new(&cells, 3, 3, 1.0);
        assert_eq!(
            find_cell_path(&view, CellCoord::new(-1, 0), CellCoord::new(2, 2), true),
            Err(PlanError::StartOutOfBounds)
        );
        assert_eq!(
            find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(3, 2), true),
            Err(PlanError::GoalOutOfBounds)
        );
    }

    #[test]
    fn blocked_start_cell_can_still_be_left() {
        let cells = grid_with(3, 1, &[(0, 0)]);
        let view = OccupancyView::new(&cells, 3, 1, 1.0);
        let path = find_cell_path(&view, CellCoord::new(0, 0), CellCoord::new(2, 0), false)
            .expect("start occupancy is ignored");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn equal_estimates_pop_in_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenEntry {
            estimate: 2.0,
            sequence: 0,
            index: 10,
        });
        heap.push(OpenEntry {
            estimate: 2.0,
            sequence: 1,
            index: 11,
        });
        heap.push(OpenEntry {
            estimate: 1.0,
            sequence: 2,
            index: 12,
        });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|entry| entry.index)).collect();
        assert_eq!(order, vec![12, 10, 11]);
    }
}
