//! TOML scenario files describing a playfield, its obstacles, and one walking agent.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use gridwalk_core::{
    Aabb, AgentConfig, AgentId, Category, Command, GridConfig, InstanceId, InstanceSnapshot,
    Playfield, Vec2,
};
use serde::Deserialize;

/// Identifier given to the single agent driven by a scenario.
pub(crate) const SCENARIO_AGENT: AgentId = AgentId::new(1);

/// Parsed scenario file. Values are validated when converted into commands.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) playfield: PlayfieldSpec,
    #[serde(default)]
    pub(crate) grid: GridSpec,
    #[serde(default)]
    pub(crate) obstacle_categories: Vec<u32>,
    #[serde(default)]
    pub(crate) obstacles: Vec<ObstacleSpec>,
    pub(crate) agent: AgentSpec,
    pub(crate) target: [f32; 2],
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayfieldSpec {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Default for PlayfieldSpec {
    fn default() -> Self {
        let playfield = Playfield::default();
        Self {
            width: playfield.width(),
            height: playfield.height(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GridSpec {
    #[serde(default = "default_cell_size")]
    pub(crate) cell_size: f32,
    #[serde(default = "default_true")]
    pub(crate) allow_diagonal: bool,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            allow_diagonal: true,
        }
    }
}

/// Obstacle present for a window of frames.
///
/// `appear_frame` and `vanish_frame` let a scenario open or close passages
/// while the agent is walking.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObstacleSpec {
    pub(crate) id: u32,
    pub(crate) category: u32,
    pub(crate) min: [f32; 2],
    pub(crate) max: [f32; 2],
    #[serde(default = "default_true")]
    pub(crate) active: bool,
    #[serde(default)]
    pub(crate) appear_frame: u32,
    #[serde(default)]
    pub(crate) vanish_frame: Option<u32>,
}

impl ObstacleSpec {
    fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            id: InstanceId::new(self.id),
            category: Category::new(self.category),
            bounds: Aabb::from_corners(Vec2::from(self.min), Vec2::from(self.max)),
            active: self.active,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AgentSpec {
    pub(crate) position: [f32; 2],
    #[serde(default = "default_agent_size")]
    pub(crate) size: [f32; 2],
    #[serde(default = "default_speed")]
    pub(crate) speed: f32,
    #[serde(default = "default_true")]
    pub(crate) auto_repath: bool,
    #[serde(default = "default_repath_interval_ms")]
    pub(crate) repath_interval_ms: u64,
    #[serde(default)]
    pub(crate) body: Option<BodySpec>,
}

/// Instance representing the agent's own body.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BodySpec {
    pub(crate) id: u32,
    pub(crate) category: u32,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub(crate) fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse scenario TOML")
    }

    /// Validates the scenario and produces the commands that set up the world.
    pub(crate) fn setup_commands(&self) -> Result<Vec<Command>> {
        let playfield = Playfield::new(self.playfield.width, self.playfield.height)
            .context("invalid [playfield]")?;
        let grid = GridConfig::new(self.grid.cell_size, self.grid.allow_diagonal)
            .context("invalid [grid]")?;
        let _ = grid
            .dimensions_for(playfield)
            .context("[grid] cell size does not fit the [playfield]")?;
        let config = AgentConfig::new(
            self.agent.speed,
            self.agent.auto_repath,
            Duration::from_millis(self.agent.repath_interval_ms),
        )
        .context("invalid [agent]")?;

        let mut commands = vec![
            Command::ConfigurePlayfield { playfield },
            Command::ConfigureGrid { config: grid },
            Command::RegisterObstacleCategories {
                categories: self
                    .obstacle_categories
                    .iter()
                    .copied()
                    .map(Category::new)
                    .collect(),
            },
        ];
        commands.extend(self.frame_commands(0));

        let position = Vec2::from(self.agent.position);
        let size = Vec2::from(self.agent.size);
        if let Some(body) = self.agent.body {
            commands.push(Command::UpsertInstance {
                snapshot: InstanceSnapshot {
                    id: InstanceId::new(body.id),
                    category: Category::new(body.category),
                    bounds: Aabb::from_center_size(position, size),
                    active: true,
                },
            });
        }
        commands.push(Command::SpawnAgent {
            agent: SCENARIO_AGENT,
            instance: self.agent.body.map(|body| InstanceId::new(body.id)),
            position,
            size,
            config,
        });

        Ok(commands)
    }

    /// Obstacle changes scheduled for the provided frame.
    pub(crate) fn frame_commands(&self, frame: u32) -> Vec<Command> {
        let mut commands = Vec::new();
        for obstacle in &self.obstacles {
            if obstacle.vanish_frame == Some(frame) {
                commands.push(Command::RemoveInstance {
                    instance: InstanceId::new(obstacle.id),
                });
            } else if obstacle.appear_frame == frame {
                commands.push(Command::UpsertInstance {
                    snapshot: obstacle.snapshot(),
                });
            }
        }
        commands
    }

    pub(crate) fn target(&self) -> Vec2 {
        Vec2::from(self.target)
    }
}

fn default_true() -> bool {
    true
}

fn default_cell_size() -> f32 {
    GridConfig::default().cell_size()
}

fn default_speed() -> f32 {
    AgentConfig::default().speed()
}

fn default_repath_interval_ms() -> u64 {
    AgentConfig::default().repath_interval().as_millis() as u64
}

fn default_agent_size() -> [f32; 2] {
    [16.0, 16.0]
}
