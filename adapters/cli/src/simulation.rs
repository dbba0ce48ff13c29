//! Frame loop that drives the world and the steering system for a scenario.

use std::time::Duration;

use anyhow::Result;
use gridwalk_core::{CellCoord, Command, Event, PlanError, Vec2};
use gridwalk_system_steering::Steering;
use gridwalk_world::{self as world, query, World};
use serde::Serialize;

use crate::scenario::{Scenario, SCENARIO_AGENT};

/// Final state of the scenario agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub(crate) enum Outcome {
    /// The agent reached its target.
    Arrived,
    /// Frames ran out while the agent was still walking.
    Walking,
    /// The initial move request failed.
    Rejected { reason: PlanError },
}

/// Summary written at the end of a run, also used as the JSON report.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) outcome: Outcome,
    pub(crate) frames: u32,
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) position: [f32; 2],
    pub(crate) initial_route: Vec<[f32; 2]>,
    pub(crate) remaining_route: Vec<[f32; 2]>,
    pub(crate) blocked_cells: Vec<CellCoord>,
    pub(crate) repaths: usize,
    pub(crate) repath_failures: usize,
    pub(crate) completions: usize,
}

/// Runs the scenario for up to `frames` ticks of `dt`, stopping early on arrival.
pub(crate) fn run(scenario: &Scenario, frames: u32, dt: Duration) -> Result<Report> {
    let mut world = World::new();
    let mut steering = Steering::default();
    let mut log = Vec::new();

    let mut events = Vec::new();
    for command in scenario.setup_commands()? {
        world::apply(&mut world, command, &mut events);
    }
    log.append(&mut events);

    let target = scenario.target();
    let accepted = world::move_to(&mut world, SCENARIO_AGENT, target, &mut events);
    let initial_route = points(query::waypoints(&world, SCENARIO_AGENT));
    let rejection = events.iter().find_map(|event| match event {
        Event::PathRejected { reason, .. } => Some(*reason),
        _ => None,
    });
    log.append(&mut events);

    let mut frames_run = 0;
    if accepted {
        tracing::info!(
            waypoints = initial_route.len(),
            x = target.x,
            y = target.y,
            "walking toward target"
        );
        for frame in 1..=frames {
            for command in scenario.frame_commands(frame) {
                world::apply(&mut world, command, &mut events);
            }
            run_frame(&mut world, &mut steering, dt, &mut events);
            log.append(&mut events);
            frames_run = frame;

            if query::has_arrived(&world, SCENARIO_AGENT) {
                break;
            }
        }
    }

    let outcome = match rejection {
        Some(reason) if !accepted => Outcome::Rejected { reason },
        _ if query::has_arrived(&world, SCENARIO_AGENT) => Outcome::Arrived,
        _ => Outcome::Walking,
    };
    let (columns, rows) = query::grid_dimensions(&world);

    Ok(Report {
        outcome,
        frames: frames_run,
        columns,
        rows,
        position: query::agent_position(&world, SCENARIO_AGENT)
            .unwrap_or(Vec2::ZERO)
            .to_array(),
        initial_route,
        remaining_route: points(query::waypoints(&world, SCENARIO_AGENT)),
        blocked_cells: query::blocked_cells(&world),
        repaths: count(&log, |event| matches!(event, Event::RepathDue { .. })),
        repath_failures: count(&log, |event| matches!(event, Event::RepathFailed { .. })),
        completions: count(&log, |event| matches!(event, Event::PathCompleted { .. })),
    })
}

/// Ticks the world once and relays events through steering until no commands remain.
fn run_frame(world: &mut World, steering: &mut Steering, dt: Duration, log: &mut Vec<Event>) {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);

    while !events.is_empty() {
        let agents = query::agent_view(world);
        let mut commands = Vec::new();
        steering.handle(&events, &agents, &mut commands);
        log.append(&mut events);

        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

fn points(waypoints: &[Vec2]) -> Vec<[f32; 2]> {
    waypoints.iter().map(|point| point.to_array()).collect()
}

fn count(log: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    log.iter().filter(|event| predicate(event)).count()
}
