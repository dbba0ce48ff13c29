#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Steering system that walks agents along their routes one frame at a time.

use std::time::Duration;

use gridwalk_core::{AgentSnapshot, AgentView, Command, Event, Vec2};

/// Pure system that turns elapsed time into agent advancement commands.
///
/// Each frame every moving agent travels `speed * dt` toward its next
/// waypoint. Agents that would reach or pass the waypoint within the frame
/// are snapped exactly onto it instead, which keeps low frame rates from
/// oscillating around the target.
#[derive(Debug, Default)]
pub struct Steering;

impl Steering {
    /// Consumes world events and agent snapshots to emit steering commands.
    ///
    /// Advancement commands are emitted for every moving agent in identifier
    /// order, followed by one re-plan command per due repath notification.
    pub fn handle(&mut self, events: &[Event], agents: &AgentView, out: &mut Vec<Command>) {
        let dt = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add);

        if !dt.is_zero() {
            for agent in agents.iter() {
                if let Some(command) = advance(agent, dt) {
                    out.push(command);
                }
            }
        }

        for event in events {
            if let Event::RepathDue { agent } = event {
                out.push(Command::Repath { agent: *agent });
            }
        }
    }
}

fn advance(agent: &AgentSnapshot, dt: Duration) -> Option<Command> {
    if !agent.moving {
        return None;
    }
    let waypoint = agent.next_waypoint?;
    let (position, reached) = step_toward(agent.position, waypoint, agent.speed * dt.as_secs_f32());

    tracing::trace!(
        agent = agent.id.get(),
        x = position.x,
        y = position.y,
        reached,
        "agent stepped"
    );
    Some(Command::AdvanceAgent {
        agent: agent.id,
        position,
        waypoint_index: agent.waypoint_index,
        reached,
    })
}

/// Moves `position` up to `travel` world units toward `waypoint`.
///
/// Returns the new position and whether the waypoint was reached. A waypoint
/// closer than `travel` is reached exactly, never overshot.
#[must_use]
pub fn step_toward(position: Vec2, waypoint: Vec2, travel: f32) -> (Vec2, bool) {
    let offset = waypoint - position;
    let distance = offset.length();

    if distance < travel || distance <= f32::EPSILON {
        return (waypoint, true);
    }

    (position + offset / distance * travel, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::AgentId;

    fn moving_agent(id: u32, position: Vec2, waypoint: Vec2) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            position,
            speed: 100.0,
            waypoint_index: 2,
            next_waypoint: Some(waypoint),
            moving: true,
            arrived: false,
        }
    }

    #[test]
    fn step_moves_along_bearing() {
        let (position, reached) = step_toward(Vec2::ZERO, Vec2::new(30.0, 40.0), 10.0);
        assert!(!reached);
        assert!((position - Vec2::new(6.0, 8.0)).length() < 1e-5);
    }

    #[test]
    fn step_snaps_when_waypoint_is_within_reach() {
        let waypoint = Vec2::new(3.0, 4.0);
        assert_eq!(step_toward(Vec2::ZERO, waypoint, 5.5), (waypoint, true));
        assert_eq!(step_toward(waypoint, waypoint, 0.0), (waypoint, true));
    }

    #[test]
    fn handle_without_elapsed_time_only_forwards_repaths() {
        let agents = AgentView::from_snapshots(vec![moving_agent(
            1,
            Vec2::ZERO,
            Vec2::new(50.0, 0.0),
        )]);
        let mut out = Vec::new();
        Steering.handle(
            &[Event::RepathDue {
                agent: AgentId::new(1),
            }],
            &agents,
            &mut out,
        );
        assert_eq!(
            out,
            vec![Command::Repath {
                agent: AgentId::new(1)
            }]
        );
    }

    #[test]
    fn handle_sums_ticks_and_skips_idle_agents() {
        let mut idle = moving_agent(2, Vec2::ZERO, Vec2::new(50.0, 0.0));
        idle.moving = false;
        let agents = AgentView::from_snapshots(vec![
            idle,
            moving_agent(1, Vec2::ZERO, Vec2::new(50.0, 0.0)),
        ]);
        let tick = Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        };

        let mut out = Vec::new();
        Steering.handle(&[tick.clone(), tick], &agents, &mut out);

        assert_eq!(
            out,
            vec![Command::AdvanceAgent {
                agent: AgentId::new(1),
                position: Vec2::new(20.0, 0.0),
                waypoint_index: 2,
                reached: false,
            }]
        );
    }
}
