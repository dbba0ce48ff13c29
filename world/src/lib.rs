#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Gridwalk navigation.
//!
//! The world owns the playfield, the obstacle snapshots supplied by the
//! runtime, and every agent's path state. All mutations flow through
//! [`apply`]; read access goes through the [`query`] module.

use std::collections::{BTreeMap, BTreeSet};

use gridwalk_core::{
    AgentConfig, AgentId, Category, Command, Event, GridConfig, InstanceId, InstanceSnapshot,
    PlanError, Playfield, Route, Vec2,
};
use gridwalk_system_planning::Planner;

mod agent;
mod occupancy;

use agent::Agent;
use occupancy::OccupancyGrid;

/// Represents the authoritative navigation world.
#[derive(Debug)]
pub struct World {
    playfield: Playfield,
    grid_config: GridConfig,
    dimensions: (u32, u32),
    categories: BTreeSet<Category>,
    instances: BTreeMap<InstanceId, InstanceSnapshot>,
    agents: BTreeMap<AgentId, Agent>,
    occupancy: OccupancyGrid,
}

impl World {
    /// Creates an empty world using the default playfield and grid configuration.
    #[must_use]
    pub fn new() -> Self {
        let playfield = Playfield::default();
        let grid_config = GridConfig::default();
        let mut world = Self {
            playfield,
            grid_config,
            dimensions: grid_config.dimensions_for(playfield).unwrap_or((0, 0)),
            categories: BTreeSet::new(),
            instances: BTreeMap::new(),
            agents: BTreeMap::new(),
            occupancy: OccupancyGrid::default(),
        };
        world.rebuild_occupancy(None);
        world
    }

    /// Discards the occupancy grid and rebuilds it from the current instance snapshots.
    fn rebuild_occupancy(&mut self, excluded: Option<InstanceId>) {
        let (columns, rows) = self.dimensions;
        self.occupancy.rebuild_with(
            columns,
            rows,
            self.grid_config.cell_size(),
            self.instances.values(),
            &self.categories,
            excluded,
        );
    }

    /// Adopts a new playfield and grid configuration when their layout fits.
    ///
    /// A refused layout leaves the previous configuration and grid untouched.
    fn configure(
        &mut self,
        playfield: Playfield,
        grid_config: GridConfig,
        out_events: &mut Vec<Event>,
    ) {
        match grid_config.dimensions_for(playfield) {
            Ok((columns, rows)) => {
                self.playfield = playfield;
                self.grid_config = grid_config;
                self.dimensions = (columns, rows);
                self.rebuild_occupancy(None);
                tracing::debug!(columns, rows, "grid configured");
                out_events.push(Event::GridConfigured { columns, rows });
            }
            Err(error) => {
                tracing::warn!(%error, "configuration rejected");
                out_events.push(Event::ConfigurationRejected { error });
            }
        }
    }

    /// Rebuilds the grid around the agent and plans a route toward `target`.
    fn plan_route(&mut self, agent: AgentId, target: Vec2) -> Result<Route, PlanError> {
        let (position, excluded) = self
            .agents
            .get(&agent)
            .map(|agent| (agent.position, agent.instance))
            .ok_or(PlanError::UnknownAgent)?;

        self.rebuild_occupancy(excluded);
        Planner::from_config(&self.grid_config).plan(&self.occupancy.view(), position, target)
    }

    fn move_agent(&mut self, agent_id: AgentId, target: Vec2, out_events: &mut Vec<Event>) {
        let planned = self.plan_route(agent_id, target);
        let Some(agent) = self.agents.get_mut(&agent_id) else {
            out_events.push(Event::PathRejected {
                agent: agent_id,
                reason: PlanError::UnknownAgent,
            });
            return;
        };

        match planned {
            Ok(route) => {
                let waypoints = route.len();
                agent
                    .path
                    .assign(route, target, agent.config.repath_interval());
                tracing::debug!(agent = agent_id.get(), waypoints, "route assigned");
                out_events.push(Event::PathAssigned {
                    agent: agent_id,
                    waypoints,
                });
            }
            Err(reason) => {
                let _ = agent.path.clear();
                tracing::debug!(agent = agent_id.get(), %reason, "move request rejected");
                out_events.push(Event::PathRejected {
                    agent: agent_id,
                    reason,
                });
            }
        }
    }

    fn repath_agent(&mut self, agent_id: AgentId, out_events: &mut Vec<Event>) {
        let Some(target) = self
            .agents
            .get(&agent_id)
            .filter(|agent| agent.path.moving)
            .and_then(|agent| agent.path.target)
        else {
            return;
        };

        let planned = self.plan_route(agent_id, target);
        let Some(agent) = self.agents.get_mut(&agent_id) else {
            return;
        };

        match planned {
            Ok(route) => {
                let waypoints = route.len();
                agent
                    .path
                    .assign(route, target, agent.config.repath_interval());
                tracing::trace!(agent = agent_id.get(), waypoints, "route refreshed");
                out_events.push(Event::PathAssigned {
                    agent: agent_id,
                    waypoints,
                });
            }
            Err(reason) => {
                // The stale route stays in place and following continues.
                tracing::debug!(agent = agent_id.get(), %reason, "repath failed");
                out_events.push(Event::RepathFailed {
                    agent: agent_id,
                    reason,
                });
            }
        }
    }

    fn advance_agent(
        &mut self,
        agent_id: AgentId,
        position: Vec2,
        waypoint_index: usize,
        reached: bool,
        out_events: &mut Vec<Event>,
    ) {
        let Some(agent) = self.agents.get_mut(&agent_id) else {
            return;
        };
        if !agent.path.moving || agent.path.next_index != waypoint_index {
            return;
        }
        let Some(waypoint) = agent.path.route.get(waypoint_index) else {
            return;
        };

        let from = agent.position;
        let to = if reached { waypoint } else { position };
        let body = agent
            .instance
            .and_then(|instance| self.instances.get_mut(&instance));
        agent.relocate(to, body);
        out_events.push(Event::AgentAdvanced {
            agent: agent_id,
            from,
            to,
        });

        if reached && agent.path.advance_index() {
            agent.path.arrive();
            tracing::debug!(agent = agent_id.get(), "path completed");
            out_events.push(Event::PathCompleted { agent: agent_id });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigurePlayfield { playfield } => {
            world.configure(playfield, world.grid_config, out_events);
        }
        Command::ConfigureGrid { config } => {
            world.configure(world.playfield, config, out_events);
        }
        Command::RegisterObstacleCategories { categories } => {
            world.categories = categories.into_iter().collect();
        }
        Command::UpsertInstance { snapshot } => {
            let _ = world.instances.insert(snapshot.id, snapshot);
        }
        Command::RemoveInstance { instance } => {
            let _ = world.instances.remove(&instance);
        }
        Command::SpawnAgent {
            agent,
            instance,
            position,
            size,
            config,
        } => {
            let _ = world
                .agents
                .insert(agent, Agent::new(agent, instance, position, size, config));
            out_events.push(Event::AgentSpawned { agent });
        }
        Command::MoveTo { agent, target } => world.move_agent(agent, target, out_events),
        Command::Stop { agent } => {
            if let Some(state) = world.agents.get_mut(&agent) {
                if state.path.clear() {
                    out_events.push(Event::PathCleared { agent });
                }
            }
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });

            for agent in world.agents.values_mut() {
                let config: AgentConfig = agent.config;
                if !config.auto_repath() {
                    continue;
                }
                if agent.path.count_down(dt, config.repath_interval()) {
                    out_events.push(Event::RepathDue { agent: agent.id });
                }
            }
        }
        Command::AdvanceAgent {
            agent,
            position,
            waypoint_index,
            reached,
        } => world.advance_agent(agent, position, waypoint_index, reached, out_events),
        Command::Repath { agent } => world.repath_agent(agent, out_events),
    }
}

/// Requests a route for `agent` toward `target`, returning whether the agent is now moving.
///
/// On failure any previous route is cleared and the agent is left idle.
pub fn move_to(world: &mut World, agent: AgentId, target: Vec2, out_events: &mut Vec<Event>) -> bool {
    apply(world, Command::MoveTo { agent, target }, out_events);
    query::is_path_active(world, agent)
}

/// Clears the agent's route and flags. Safe to call on idle or unknown agents.
pub fn stop(world: &mut World, agent: AgentId, out_events: &mut Vec<Event>) {
    apply(world, Command::Stop { agent }, out_events);
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use gridwalk_core::{AgentId, AgentView, CellCoord, InstanceSnapshot, OccupancyView, Vec2};

    /// Columns and rows of the grid derived from the playfield and cell size.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        world.dimensions
    }

    /// Exposes the occupancy grid produced by the most recent rebuild.
    ///
    /// Grids built for a planning request exclude the requesting agent's own
    /// instance.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.occupancy.view()
    }

    /// Enumerates the blocked cells of the most recent rebuild in row-major order.
    #[must_use]
    pub fn blocked_cells(world: &World) -> Vec<CellCoord> {
        world.occupancy.view().blocked_cells().collect()
    }

    /// Captures a read-only view of every agent in identifier order.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.values().map(|agent| agent.snapshot()).collect())
    }

    /// Current position of the agent.
    #[must_use]
    pub fn agent_position(world: &World, agent: AgentId) -> Option<Vec2> {
        world.agents.get(&agent).map(|agent| agent.position)
    }

    /// Waypoints of the agent's current route, empty when idle or arrived.
    #[must_use]
    pub fn waypoints(world: &World, agent: AgentId) -> &[Vec2] {
        world
            .agents
            .get(&agent)
            .map(|agent| agent.path.route.waypoints())
            .unwrap_or(&[])
    }

    /// Reports whether the agent reached the end of its last route.
    ///
    /// Stays `true` until the next move request or stop.
    #[must_use]
    pub fn has_arrived(world: &World, agent: AgentId) -> bool {
        world
            .agents
            .get(&agent)
            .is_some_and(|agent| agent.path.arrived)
    }

    /// Reports whether the agent is currently following a route.
    #[must_use]
    pub fn is_path_active(world: &World, agent: AgentId) -> bool {
        world
            .agents
            .get(&agent)
            .is_some_and(|agent| agent.path.moving)
    }

    /// Last target the agent was sent toward while it still pursues it.
    #[must_use]
    pub fn target(world: &World, agent: AgentId) -> Option<Vec2> {
        world.agents.get(&agent).and_then(|agent| agent.path.target)
    }

    /// Iterator over the instance snapshots in identifier order.
    pub fn instances(world: &World) -> impl Iterator<Item = &InstanceSnapshot> {
        world.instances.values()
    }
}
