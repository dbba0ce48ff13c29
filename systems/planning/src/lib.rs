#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Route planning: best-first grid search followed by string-pulling compression.

use gridwalk_core::{GridConfig, OccupancyView, PlanError, Route, Vec2};

mod compress;
mod search;

pub use compress::compress;
pub use search::find_cell_path;

/// Pure planner that turns a start and goal point into a compressed route.
#[derive(Clone, Copy, Debug)]
pub struct Planner {
    allow_diagonal: bool,
}

impl Planner {
    /// Creates a planner with explicit diagonal movement support.
    #[must_use]
    pub const fn new(allow_diagonal: bool) -> Self {
        Self { allow_diagonal }
    }

    /// Creates a planner matching the movement options of a grid configuration.
    #[must_use]
    pub const fn from_config(config: &GridConfig) -> Self {
        Self::new(config.allow_diagonal())
    }

    /// Computes the uncompressed route between two world points.
    ///
    /// The first point is the exact `start` position and is followed by the
    /// center of every cell after the start cell, up to and including the
    /// goal cell. When both points share a cell the goal cell's center is the
    /// only point after `start`. Non-finite points lie outside every grid.
    pub fn raw_route(
        &self,
        view: &OccupancyView<'_>,
        start: Vec2,
        goal: Vec2,
    ) -> Result<Vec<Vec2>, PlanError> {
        if !start.is_finite() {
            return Err(PlanError::StartOutOfBounds);
        }
        if !goal.is_finite() {
            return Err(PlanError::GoalOutOfBounds);
        }
        let goal_cell = view.cell_at(goal);
        let cells = find_cell_path(view, view.cell_at(start), goal_cell, self.allow_diagonal)?;

        let mut points = Vec::with_capacity(cells.len().max(2));
        points.push(start);
        points.extend(cells.iter().skip(1).map(|cell| view.cell_center(*cell)));
        if points.len() == 1 {
            points.push(view.cell_center(goal_cell));
        }
        Ok(points)
    }

    /// Plans and compresses a route the agent can steer through.
    ///
    /// The exact start position anchors compression but is not part of the
    /// returned route: every waypoint is a cell center the agent still has to
    /// reach. A goal in direct line of sight therefore yields a single waypoint.
    pub fn plan(
        &self,
        view: &OccupancyView<'_>,
        start: Vec2,
        goal: Vec2,
    ) -> Result<Route, PlanError> {
        let raw = self.raw_route(view, start, goal)?;
        let compressed = compress(view, &raw);
        tracing::trace!(
            raw = raw.len(),
            compressed = compressed.len(),
            "route compressed"
        );
        Ok(Route::from_waypoints(
            compressed.into_iter().skip(1).collect(),
        ))
    }
}
