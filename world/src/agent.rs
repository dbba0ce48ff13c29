use std::time::Duration;

use gridwalk_core::{
    Aabb, AgentConfig, AgentId, AgentSnapshot, InstanceId, InstanceSnapshot, Route, Vec2,
};

/// Navigating agent owned by the world.
#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) instance: Option<InstanceId>,
    pub(crate) position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) config: AgentConfig,
    pub(crate) path: PathState,
}

impl Agent {
    pub(crate) fn new(
        id: AgentId,
        instance: Option<InstanceId>,
        position: Vec2,
        size: Vec2,
        config: AgentConfig,
    ) -> Self {
        Self {
            id,
            instance,
            position,
            size,
            config,
            path: PathState::default(),
        }
    }

    /// Moves the agent and keeps its body instance centered on the new position.
    pub(crate) fn relocate(&mut self, position: Vec2, body: Option<&mut InstanceSnapshot>) {
        self.position = position;
        if let Some(body) = body {
            body.bounds = Aabb::from_center_size(position, self.size);
        }
    }

    pub(crate) fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            speed: self.config.speed(),
            waypoint_index: self.path.next_index,
            next_waypoint: self.path.next_waypoint(),
            moving: self.path.moving,
            arrived: self.path.arrived,
        }
    }
}

/// Route-following state carried by every agent.
///
/// The state is idle, moving, or arrived. While moving the route is non-empty
/// and `next_index` stays within its bounds.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathState {
    pub(crate) route: Route,
    pub(crate) next_index: usize,
    pub(crate) moving: bool,
    pub(crate) arrived: bool,
    pub(crate) target: Option<Vec2>,
    pub(crate) repath_timer: Duration,
}

impl PathState {
    /// Replaces the route wholesale and restarts following from its first waypoint.
    pub(crate) fn assign(&mut self, route: Route, target: Vec2, repath_interval: Duration) {
        self.moving = !route.is_empty();
        self.route = route;
        self.next_index = 0;
        self.arrived = false;
        self.target = Some(target);
        self.repath_timer = repath_interval;
    }

    /// Drops the route and every flag, returning whether the agent was moving.
    pub(crate) fn clear(&mut self) -> bool {
        let was_moving = self.moving;
        *self = Self::default();
        was_moving
    }

    /// Moves to the following waypoint, returning `true` once the route is exhausted.
    pub(crate) fn advance_index(&mut self) -> bool {
        self.next_index += 1;
        self.next_index >= self.route.len()
    }

    pub(crate) fn arrive(&mut self) {
        self.route = Route::default();
        self.next_index = 0;
        self.moving = false;
        self.arrived = true;
        self.target = None;
        self.repath_timer = Duration::ZERO;
    }

    /// Counts the repath timer down, returning `true` when it elapses.
    ///
    /// An elapsed timer is reset to the full interval.
    pub(crate) fn count_down(&mut self, dt: Duration, interval: Duration) -> bool {
        if !self.moving {
            return false;
        }
        self.repath_timer = self.repath_timer.saturating_sub(dt);
        if self.repath_timer.is_zero() {
            self.repath_timer = interval;
            return true;
        }
        false
    }

    pub(crate) fn next_waypoint(&self) -> Option<Vec2> {
        if self.moving {
            self.route.get(self.next_index)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(points: &[(f32, f32)]) -> Route {
        Route::from_waypoints(points.iter().map(|&(x, y)| Vec2::new(x, y)).collect())
    }

    #[test]
    fn assignment_restarts_following() {
        let mut state = PathState::default();
        state.assign(route(&[(1.0, 1.0), (2.0, 2.0)]), Vec2::new(2.0, 2.0), Duration::from_secs(1));
        assert!(!state.advance_index());
        assert_eq!(state.next_index, 1);

        state.assign(route(&[(5.0, 5.0)]), Vec2::new(5.0, 5.0), Duration::from_secs(1));
        assert_eq!(state.next_index, 0);
        assert_eq!(state.next_waypoint(), Some(Vec2::new(5.0, 5.0)));
        assert!(state.moving);
    }

    #[test]
    fn clear_reports_previous_motion() {
        let mut state = PathState::default();
        assert!(!state.clear());
        state.assign(route(&[(1.0, 1.0)]), Vec2::ONE, Duration::from_secs(1));
        assert!(state.clear());
        assert!(state.route.is_empty());
        assert!(state.target.is_none());
    }

    #[test]
    fn countdown_fires_once_per_interval() {
        let interval = Duration::from_millis(300);
        let mut state = PathState::default();
        state.assign(route(&[(1.0, 1.0)]), Vec2::ONE, interval);

        let step = Duration::from_millis(100);
        let fired: Vec<bool> = (0..6).map(|_| state.count_down(step, interval)).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn countdown_is_idle_when_not_moving() {
        let mut state = PathState::default();
        assert!(!state.count_down(Duration::from_secs(5), Duration::from_secs(1)));
    }
}
