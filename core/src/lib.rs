#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridwalk pathfinding workspace.
//!
//! This crate defines the message surface that connects the embedding
//! runtime, the authoritative world, and pure systems. The runtime submits
//! [`Command`] values describing obstacles, agents, and navigation requests,
//! the world executes those commands via its `apply` entry point, and then
//! broadcasts [`Event`] values for systems to react to deterministically.
//! Systems consume event streams, query immutable snapshots, and respond
//! exclusively with new command batches.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod occupancy;

pub use occupancy::OccupancyView;

/// Cost of a single step between orthogonally adjacent cells.
pub const ORTHOGONAL_STEP_COST: f32 = 1.0;

/// Cost of a single diagonal step, a fixed approximation of the square root of two.
pub const DIAGONAL_STEP_COST: f32 = 1.4;

const DEFAULT_PLAYFIELD_WIDTH: f32 = 640.0;
const DEFAULT_PLAYFIELD_HEIGHT: f32 = 480.0;
const DEFAULT_CELL_SIZE: f32 = 32.0;
const DEFAULT_AGENT_SPEED: f32 = 120.0;
const DEFAULT_REPATH_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on the number of cells a grid layout may contain.
pub const MAX_GRID_CELLS: u64 = 1 << 24;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the playfield dimensions and re-derives the grid layout.
    ConfigurePlayfield {
        /// Validated playfield extent in world units.
        playfield: Playfield,
    },
    /// Replaces the grid configuration and re-derives the grid layout.
    ConfigureGrid {
        /// Validated cell size and movement options.
        config: GridConfig,
    },
    /// Sets which instance categories count as obstacles during grid rebuilds.
    RegisterObstacleCategories {
        /// Categories whose active instances block cells.
        categories: Vec<Category>,
    },
    /// Inserts or replaces the snapshot of an external instance.
    UpsertInstance {
        /// Latest bounds, category, and activity of the instance.
        snapshot: InstanceSnapshot,
    },
    /// Forgets an external instance entirely.
    RemoveInstance {
        /// Identifier of the instance to remove.
        instance: InstanceId,
    },
    /// Creates or replaces a navigating agent with an empty path state.
    SpawnAgent {
        /// Identifier assigned to the agent by the runtime.
        agent: AgentId,
        /// Instance representing the agent's body, excluded from obstacle marking.
        instance: Option<InstanceId>,
        /// Center of the agent in world units.
        position: Vec2,
        /// Width and height of the agent's body in world units.
        size: Vec2,
        /// Validated movement parameters.
        config: AgentConfig,
    },
    /// Requests a route from the agent's position to the provided point.
    MoveTo {
        /// Agent that should start moving.
        agent: AgentId,
        /// Destination expressed in world units.
        target: Vec2,
    },
    /// Clears the agent's route and movement flags.
    Stop {
        /// Agent that should halt.
        agent: AgentId,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Moves an agent along its route as proposed by the steering system.
    AdvanceAgent {
        /// Agent being moved.
        agent: AgentId,
        /// Position the agent occupies after the step.
        position: Vec2,
        /// Index of the waypoint the step was computed against.
        waypoint_index: usize,
        /// Indicates whether the step landed exactly on the waypoint.
        reached: bool,
    },
    /// Rebuilds the grid and re-plans toward the agent's last requested target.
    Repath {
        /// Agent whose route should be recomputed.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces the grid layout derived from the playfield and cell size.
    GridConfigured {
        /// Number of cell columns covering the playfield.
        columns: u32,
        /// Number of cell rows covering the playfield.
        rows: u32,
    },
    /// Reports that a playfield or grid change was refused; the previous layout stays.
    ConfigurationRejected {
        /// Reason the combined layout was refused.
        error: ConfigError,
    },
    /// Confirms that an agent was created.
    AgentSpawned {
        /// Identifier of the new agent.
        agent: AgentId,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a fresh route replaced the agent's previous one.
    PathAssigned {
        /// Agent that received the route.
        agent: AgentId,
        /// Number of waypoints the agent will steer through.
        waypoints: usize,
    },
    /// Reports that a move request failed and the agent is idle.
    PathRejected {
        /// Agent whose request failed.
        agent: AgentId,
        /// Specific reason the planner gave up.
        reason: PlanError,
    },
    /// Confirms that a moving agent was stopped on request.
    PathCleared {
        /// Agent that stopped.
        agent: AgentId,
    },
    /// Confirms that an agent moved along its route.
    AgentAdvanced {
        /// Agent that moved.
        agent: AgentId,
        /// Position before the step.
        from: Vec2,
        /// Position after the step.
        to: Vec2,
    },
    /// Fires exactly once when an agent reaches the final waypoint of its route.
    PathCompleted {
        /// Agent that arrived.
        agent: AgentId,
    },
    /// Signals that the agent's repath countdown elapsed.
    RepathDue {
        /// Agent whose route is due for recomputation.
        agent: AgentId,
    },
    /// Reports that a periodic re-plan failed; the agent keeps its stale route.
    RepathFailed {
        /// Agent whose re-plan failed.
        agent: AgentId,
        /// Specific reason the planner gave up.
        reason: PlanError,
    },
}

/// Unique identifier assigned to a navigating agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an external runtime instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates a new instance identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Category tag carried by every instance and matched against registered obstacle categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category(u32);

impl Category {
    /// Creates a new category tag.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tag.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that world points outside the playfield map to
/// cells that lie outside the valid range instead of wrapping around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

/// Axis-aligned bounds expressed in world units.
///
/// Bounds are half-open: a box from `min.x = 64` to `max.x = 96` covers world
/// points up to but excluding `x = 96`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Creates bounds from two corners, normalising their order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates bounds from the top-left corner and a size.
    #[must_use]
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::from_corners(origin, origin + size)
    }

    /// Creates bounds centered on the provided point.
    #[must_use]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Minimum corner of the bounds.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Maximum corner of the bounds.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Center point of the bounds.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Immutable representation of an external instance supplied by the runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceSnapshot {
    /// Identifier assigned by the runtime.
    pub id: InstanceId,
    /// Category used to decide whether the instance counts as an obstacle.
    pub category: Category,
    /// World-space bounds of the instance.
    pub bounds: Aabb,
    /// Inactive instances never block cells.
    pub active: bool,
}

/// Immutable representation of a single agent's state used by systems.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Center of the agent in world units.
    pub position: Vec2,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Index of the waypoint the agent is steering toward.
    pub waypoint_index: usize,
    /// Waypoint the agent is steering toward, if it is moving.
    pub next_waypoint: Option<Vec2>,
    /// Indicates whether the agent is following a route.
    pub moving: bool,
    /// Indicates whether the agent reached the end of its last route.
    pub arrived: bool,
}

/// Read-only snapshot describing all agents in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Retrieves the snapshot for a single agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }
}

/// Ordered sequence of world-space waypoints an agent steers through.
///
/// Routes are immutable once produced and are replaced wholesale on re-plan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    waypoints: Vec<Vec2>,
}

impl Route {
    /// Wraps the provided waypoints in a route.
    #[must_use]
    pub fn from_waypoints(waypoints: Vec<Vec2>) -> Self {
        Self { waypoints }
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    /// Waypoint stored at the provided index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.waypoints.get(index).copied()
    }

    /// Final waypoint of the route.
    #[must_use]
    pub fn destination(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }

    /// Number of waypoints contained in the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Extent of the playable area in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playfield {
    width: f32,
    height: f32,
}

impl Playfield {
    /// Creates a playfield, rejecting empty or non-finite dimensions.
    pub fn new(width: f32, height: f32) -> Result<Self, ConfigError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidPlayfield { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width of the playfield in world units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the playfield in world units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLAYFIELD_WIDTH,
            height: DEFAULT_PLAYFIELD_HEIGHT,
        }
    }
}

/// Grid resolution and movement options used for every planning request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    cell_size: f32,
    allow_diagonal: bool,
}

impl GridConfig {
    /// Creates a grid configuration, rejecting zero, negative, or non-finite cell sizes.
    pub fn new(cell_size: f32, allow_diagonal: bool) -> Result<Self, ConfigError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            allow_diagonal,
        })
    }

    /// Side length of a single square cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Indicates whether searches may take diagonal steps.
    #[must_use]
    pub const fn allow_diagonal(&self) -> bool {
        self.allow_diagonal
    }

    /// Number of columns and rows needed to cover the playfield.
    ///
    /// Partial cells at the right and bottom edges are rounded up so the grid
    /// always covers the whole playfield. Layouts with more than
    /// [`MAX_GRID_CELLS`] cells are rejected.
    pub fn dimensions_for(&self, playfield: Playfield) -> Result<(u32, u32), ConfigError> {
        let columns = (f64::from(playfield.width()) / f64::from(self.cell_size)).ceil();
        let rows = (f64::from(playfield.height()) / f64::from(self.cell_size)).ceil();
        if columns * rows > MAX_GRID_CELLS as f64 {
            return Err(ConfigError::GridTooLarge { columns, rows });
        }
        Ok((columns as u32, rows as u32))
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            allow_diagonal: true,
        }
    }
}

/// Movement parameters owned by each agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentConfig {
    speed: f32,
    auto_repath: bool,
    repath_interval: Duration,
}

impl AgentConfig {
    /// Creates an agent configuration.
    ///
    /// The speed must be positive and finite. A zero repath interval is only
    /// accepted when automatic re-planning is disabled.
    pub fn new(
        speed: f32,
        auto_repath: bool,
        repath_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(speed));
        }
        if auto_repath && repath_interval.is_zero() {
            return Err(ConfigError::InvalidRepathInterval);
        }
        Ok(Self {
            speed,
            auto_repath,
            repath_interval,
        })
    }

    /// Travel speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Indicates whether the route is periodically recomputed while moving.
    #[must_use]
    pub const fn auto_repath(&self) -> bool {
        self.auto_repath
    }

    /// Time between forced re-plans while moving.
    #[must_use]
    pub const fn repath_interval(&self) -> Duration {
        self.repath_interval
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_AGENT_SPEED,
            auto_repath: true,
            repath_interval: DEFAULT_REPATH_INTERVAL,
        }
    }
}

/// Reasons a configuration value may be rejected before it reaches the world.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The cell size was zero, negative, or not a finite number.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
    /// The playfield had an empty or non-finite dimension.
    #[error("playfield must have positive finite dimensions, got {width}x{height}")]
    InvalidPlayfield {
        /// Rejected width.
        width: f32,
        /// Rejected height.
        height: f32,
    },
    /// The agent speed was zero, negative, or not a finite number.
    #[error("agent speed must be a positive finite number, got {0}")]
    InvalidSpeed(f32),
    /// Automatic re-planning was requested with a zero interval.
    #[error("repath interval must be non-zero when auto-repath is enabled")]
    InvalidRepathInterval,
    /// The playfield and cell size together need more cells than a grid may hold.
    #[error("grid of {columns}x{rows} cells exceeds the limit of {} cells", MAX_GRID_CELLS)]
    GridTooLarge {
        /// Columns needed to cover the playfield.
        columns: f64,
        /// Rows needed to cover the playfield.
        rows: f64,
    },
}

/// Reasons a planning request may fail. Every variant leaves the agent idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlanError {
    /// No agent with the provided identifier exists.
    #[error("unknown agent")]
    UnknownAgent,
    /// The agent's position maps to a cell outside the grid.
    #[error("start cell lies outside the grid")]
    StartOutOfBounds,
    /// The requested target maps to a cell outside the grid.
    #[error("goal cell lies outside the grid")]
    GoalOutOfBounds,
    /// The requested target cell is blocked by an obstacle.
    #[error("goal cell is blocked")]
    GoalBlocked,
    /// The search exhausted every reachable cell without finding the goal.
    #[error("goal is unreachable")]
    Unreachable,
}
