//! Scenarios, scenario sets and the configurable generator

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::params::ParameterServer;
use crate::world::{Agent, AgentId, AgentState, BehaviorModel, Bounds, World};
use crate::Result;

/// File extension of dumped scenario sets
pub const SCENARIO_SET_EXTENSION: &str = "json";

/// Parameter prefix read by [`ConfigurableScenarioGeneration`]
pub const GENERATION_PARAMS: &str = "scenario::generation::configurable";

/// Initial state of one simulation episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub agents: Vec<Agent>,
    pub ego_id: AgentId,
    pub goal: Bounds,
    pub map_bounds: Bounds,
}

impl Scenario {
    /// Fresh world in the scenario's initial state
    pub fn build_world(&self) -> World {
        let mut world = World::new(self.map_bounds)
            .with_goal(self.goal)
            .with_ego(self.ego_id);
        for agent in &self.agents {
            world.add_agent(agent.clone());
        }
        world
    }

    pub fn ego(&self) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == self.ego_id)
    }
}

/// Source of scenarios
pub trait ScenarioGeneration {
    fn scenarios(&self) -> &[Scenario];

    fn num_scenarios(&self) -> usize {
        self.scenarios().len()
    }

    fn get_scenario(&self, idx: usize) -> Option<&Scenario> {
        self.scenarios().get(idx)
    }
}

/// Named list of scenarios, the unit stored in a benchmark database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn new(name: impl Into<String>, scenarios: Vec<Scenario>) -> Self {
        Self {
            name: name.into(),
            scenarios,
        }
    }

    /// Write the set as JSON
    pub fn dump(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(set = %self.name, scenarios = self.scenarios.len(), path = %path.display(), "Dumped scenario set");
        Ok(())
    }

    /// Read a set written by [`ScenarioSet::dump`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        let set: ScenarioSet = serde_json::from_str(&content)?;
        debug!(set = %set.name, scenarios = set.scenarios.len(), "Loaded scenario set");
        Ok(set)
    }
}

impl ScenarioGeneration for ScenarioSet {
    fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

/// Seeded generator of straight multi-lane road scenarios
///
/// Lanes run along +x starting at the origin. Every lane is populated with
/// constant-velocity agents at random gaps; one agent of the ego lane becomes
/// the ego, and the goal is the last stretch of the ego lane.
#[derive(Debug, Clone)]
pub struct ConfigurableScenarioGeneration {
    set: ScenarioSet,
}

#[derive(Debug, Clone)]
struct GenerationParams {
    set_name: String,
    seed: u64,
    origin: (f64, f64),
    road_length: f64,
    num_lanes: usize,
    lane_width: f64,
    agents_per_lane: usize,
    ego_lane: usize,
    gap_range: (f64, f64),
    velocity_range: (f64, f64),
    goal_length: f64,
}

impl GenerationParams {
    fn read(params: &mut ParameterServer) -> Result<Self> {
        let mut scope = params.scope(GENERATION_PARAMS);
        let read = Self {
            set_name: scope.get_or("set_name", "Name of the generated scenario set", "highway_merge".to_string())?,
            seed: scope.get_or("seed", "Seed of the first scenario; scenario i uses seed + i", 1000u64)?,
            origin: scope.get_or("origin", "Start of the road segment [x, y]", (5060.0, 5100.0))?,
            road_length: scope.get_or("road_length", "Length of the road segment", 100.0)?,
            num_lanes: scope.get_or("num_lanes", "Number of parallel lanes", 2usize)?,
            lane_width: scope.get_or("lane_width", "Lane width", 3.5)?,
            agents_per_lane: scope.get_or("agents_per_lane", "Agents placed per lane", 3usize)?,
            ego_lane: scope.get_or("ego_lane", "Lane index holding the ego agent", 0usize)?,
            gap_range: scope.get_or("gap_range", "Bumper gap between agents [min, max]", (8.0, 20.0))?,
            velocity_range: scope.get_or("velocity_range", "Initial velocity [min, max]", (8.0, 12.0))?,
            goal_length: scope.get_or("goal_length", "Length of the goal region at the end of the ego lane", 15.0)?,
        };
        read.validate()?;
        Ok(read)
    }

    fn validate(&self) -> Result<()> {
        if self.num_lanes == 0 || self.agents_per_lane == 0 {
            return Err(CoreError::InvalidParam(
                "num_lanes and agents_per_lane must be at least 1".to_string(),
            ));
        }
        if self.ego_lane >= self.num_lanes {
            return Err(CoreError::InvalidParam(format!(
                "ego_lane {} outside of {} lanes",
                self.ego_lane, self.num_lanes
            )));
        }
        if self.lane_width <= 0.0 || self.road_length <= 0.0 || self.goal_length <= 0.0 {
            return Err(CoreError::InvalidParam(
                "lane_width, road_length and goal_length must be positive".to_string(),
            ));
        }
        for (name, (min, max)) in [("gap_range", self.gap_range), ("velocity_range", self.velocity_range)] {
            if min > max || min < 0.0 {
                return Err(CoreError::InvalidParam(format!(
                    "{} must satisfy 0 <= min <= max, got [{}, {}]",
                    name, min, max
                )));
            }
        }
        Ok(())
    }
}

impl ConfigurableScenarioGeneration {
    /// Generate `num_scenarios` scenarios from the parameters below [`GENERATION_PARAMS`]
    pub fn new(num_scenarios: usize, params: &mut ParameterServer) -> Result<Self> {
        let config = GenerationParams::read(params)?;
        let scenarios = (0..num_scenarios)
            .map(|idx| generate_scenario(&config, config.seed.wrapping_add(idx as u64)))
            .collect();

        info!(set = %config.set_name, num_scenarios, "Generated scenarios");
        Ok(Self {
            set: ScenarioSet::new(config.set_name, scenarios),
        })
    }

    pub fn set(&self) -> &ScenarioSet {
        &self.set
    }

    pub fn into_set(self) -> ScenarioSet {
        self.set
    }
}

impl ScenarioGeneration for ConfigurableScenarioGeneration {
    fn scenarios(&self) -> &[Scenario] {
        &self.set.scenarios
    }
}

fn generate_scenario(config: &GenerationParams, seed: u64) -> Scenario {
    let mut rng = StdRng::seed_from_u64(seed);
    let (origin_x, origin_y) = config.origin;
    let ego_slot = rng.gen_range(0..config.agents_per_lane);

    let mut agents = Vec::with_capacity(config.num_lanes * config.agents_per_lane);
    let mut ego_id = 0;
    let mut next_id: AgentId = 1;

    for lane in 0..config.num_lanes {
        let y = origin_y + (lane as f64 + 0.5) * config.lane_width;
        let mut x = origin_x + rng.gen_range(0.0..=config.gap_range.0);

        for slot in 0..config.agents_per_lane {
            let velocity = rng.gen_range(config.velocity_range.0..=config.velocity_range.1);
            let agent = Agent::new(
                next_id,
                AgentState::new(x, y, 0.0, velocity),
                BehaviorModel::ConstantVelocity,
            );
            if lane == config.ego_lane && slot == ego_slot {
                ego_id = next_id;
            }
            x += agent.length + rng.gen_range(config.gap_range.0..=config.gap_range.1);
            agents.push(agent);
            next_id += 1;
        }
    }

    let road_end = origin_x + config.road_length;
    let lane_y_min = origin_y + config.ego_lane as f64 * config.lane_width;
    Scenario {
        agents,
        ego_id,
        goal: Bounds::new(
            road_end - config.goal_length,
            road_end,
            lane_y_min,
            lane_y_min + config.lane_width,
        ),
        map_bounds: Bounds::new(
            origin_x,
            road_end,
            origin_y,
            origin_y + config.num_lanes as f64 * config.lane_width,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_generation_is_deterministic() {
        let mut params = ParameterServer::new();
        let first = ConfigurableScenarioGeneration::new(3, &mut params).unwrap();
        let second = ConfigurableScenarioGeneration::new(3, &mut params).unwrap();
        assert_eq!(first.set(), second.set());
        assert_eq!(first.num_scenarios(), 3);
    }

    #[test]
    fn test_generation_layout() {
        let mut params = ParameterServer::from_json(json!({
            "scenario": { "generation": { "configurable": {
                "num_lanes": 3, "agents_per_lane": 2, "ego_lane": 1
            }}}
        }))
        .unwrap();
        let generation = ConfigurableScenarioGeneration::new(1, &mut params).unwrap();
        let scenario = generation.get_scenario(0).unwrap();

        assert_eq!(scenario.agents.len(), 6);
        let ego = scenario.ego().unwrap();
        assert!(scenario.goal.contains_point(scenario.goal.x_max, ego.state.y));
        assert!(scenario.map_bounds.contains_point(ego.state.x, ego.state.y));
    }

    #[test]
    fn test_generation_records_defaults() {
        let mut params = ParameterServer::new();
        ConfigurableScenarioGeneration::new(1, &mut params).unwrap();
        assert_eq!(
            params.get::<u64>("scenario::generation::configurable::seed").unwrap(),
            Some(1000)
        );
    }

    #[test]
    fn test_invalid_ego_lane() {
        let mut params = ParameterServer::from_json(json!({
            "scenario": { "generation": { "configurable": { "num_lanes": 1, "ego_lane": 2 }}}
        }))
        .unwrap();
        let err = ConfigurableScenarioGeneration::new(1, &mut params).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParam(_)));
    }

    #[test]
    fn test_scenario_set_dump_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sets").join("merge.json");

        let mut params = ParameterServer::new();
        let set = ConfigurableScenarioGeneration::new(2, &mut params).unwrap().into_set();
        set.dump(&path).unwrap();

        let loaded = ScenarioSet::load(&path).unwrap();
        assert_eq!(loaded.name, "highway_merge");
        assert_eq!(loaded.num_scenarios(), 2);
        assert_eq!(loaded.scenarios[1].ego_id, set.scenarios[1].ego_id);
    }

    #[test]
    fn test_build_world_installs_ego_and_goal() {
        let mut params = ParameterServer::new();
        let generation = ConfigurableScenarioGeneration::new(1, &mut params).unwrap();
        let scenario = generation.get_scenario(0).unwrap();
        let world = scenario.build_world();
        assert_eq!(world.ego_id(), Some(scenario.ego_id));
        assert_eq!(world.goal(), Some(&scenario.goal));
        assert_eq!(world.agent_count(), scenario.agents.len());
    }
}
