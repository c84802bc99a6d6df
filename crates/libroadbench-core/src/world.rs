//! Kinematic world stand-in
//!
//! Agents are oriented rectangles reduced to axis-aligned footprints. Each step
//! every agent asks its behavior model for the next state; there is no
//! dynamics or collision response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Result;

/// Identifier of an agent within a world
pub type AgentId = u32;

/// Default vehicle length in meters
pub const DEFAULT_AGENT_LENGTH: f64 = 4.5;

/// Default vehicle width in meters
pub const DEFAULT_AGENT_WIDTH: f64 = 1.8;

/// Planar state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    pub theta: f64,
    /// Longitudinal velocity in m/s
    pub velocity: f64,
}

impl AgentState {
    pub fn new(x: f64, y: f64, theta: f64, velocity: f64) -> Self {
        Self { x, y, theta, velocity }
    }

    /// Move along the heading with the mean of the current and next velocity
    fn advance(&self, next_velocity: f64, dt: f64) -> Self {
        let mean = 0.5 * (self.velocity + next_velocity);
        Self {
            x: self.x + mean * self.theta.cos() * dt,
            y: self.y + mean * self.theta.sin() * dt,
            theta: self.theta,
            velocity: next_velocity,
        }
    }
}

/// Behavior model driving an agent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorModel {
    #[default]
    ConstantVelocity,
    ConstantAcceleration {
        acceleration: f64,
        max_velocity: f64,
    },
    Stationary,
}

impl BehaviorModel {
    /// Next state after `dt` seconds
    pub fn plan(&self, state: &AgentState, dt: f64) -> AgentState {
        match self {
            BehaviorModel::ConstantVelocity => state.advance(state.velocity, dt),
            BehaviorModel::ConstantAcceleration {
                acceleration,
                max_velocity,
            } => {
                let next = (state.velocity + acceleration * dt).clamp(0.0, max_velocity.max(0.0));
                state.advance(next, dt)
            }
            BehaviorModel::Stationary => AgentState {
                velocity: 0.0,
                ..*state
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorModel::ConstantVelocity => "constant_velocity",
            BehaviorModel::ConstantAcceleration { .. } => "constant_acceleration",
            BehaviorModel::Stationary => "stationary",
        }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min: x_min.min(x_max),
            x_max: x_min.max(x_max),
            y_min: y_min.min(y_max),
            y_max: y_min.max(y_max),
        }
    }

    pub fn from_ranges(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self::new(x_range.0, x_range.1, y_range.0, y_range.1)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// `other` lies completely inside `self`
    pub fn contains(&self, other: &Bounds) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x_min < other.x_max
            && other.x_min < self.x_max
            && self.y_min < other.y_max
            && other.y_min < self.y_max
    }
}

/// A traffic participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub state: AgentState,
    pub behavior: BehaviorModel,
    pub length: f64,
    pub width: f64,
}

impl Agent {
    pub fn new(id: AgentId, state: AgentState, behavior: BehaviorModel) -> Self {
        Self {
            id,
            state,
            behavior,
            length: DEFAULT_AGENT_LENGTH,
            width: DEFAULT_AGENT_WIDTH,
        }
    }

    /// Axis-aligned footprint around the agent center
    pub fn footprint(&self) -> Bounds {
        let (sin, cos) = self.state.theta.sin_cos();
        let half_x = 0.5 * (self.length * cos.abs() + self.width * sin.abs());
        let half_y = 0.5 * (self.length * sin.abs() + self.width * cos.abs());
        Bounds::new(
            self.state.x - half_x,
            self.state.x + half_x,
            self.state.y - half_y,
            self.state.y + half_y,
        )
    }
}

/// Simulation world: agents, map bounds, optional goal and ego
#[derive(Debug, Clone)]
pub struct World {
    time: f64,
    agents: BTreeMap<AgentId, Agent>,
    bounds: Bounds,
    goal: Option<Bounds>,
    ego_id: Option<AgentId>,
}

impl World {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            time: 0.0,
            agents: BTreeMap::new(),
            bounds,
            goal: None,
            ego_id: None,
        }
    }

    pub fn with_goal(mut self, goal: Bounds) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn with_ego(mut self, ego_id: AgentId) -> Self {
        self.ego_id = Some(ego_id);
        self
    }

    pub fn add_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.id, agent);
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn ego_id(&self) -> Option<AgentId> {
        self.ego_id
    }

    pub fn ego(&self) -> Option<&Agent> {
        self.ego_id.and_then(|id| self.agents.get(&id))
    }

    pub fn goal(&self) -> Option<&Bounds> {
        self.goal.as_ref()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Simulated time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Replace the behavior of one agent
    pub fn set_behavior(&mut self, id: AgentId, behavior: BehaviorModel) -> Result<()> {
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Agent {} not found", id)))?;
        agent.behavior = behavior;
        Ok(())
    }

    /// Advance all agents by `dt` seconds
    pub fn step(&mut self, dt: f64) {
        for agent in self.agents.values_mut() {
            agent.state = agent.behavior.plan(&agent.state, dt);
        }
        self.time += dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_velocity_moves_along_heading() {
        let state = AgentState::new(0.0, 0.0, 0.0, 10.0);
        let next = BehaviorModel::ConstantVelocity.plan(&state, 0.5);
        assert!((next.x - 5.0).abs() < 1e-9);
        assert!(next.y.abs() < 1e-9);
        assert_eq!(next.velocity, 10.0);
    }

    #[test]
    fn test_constant_acceleration_is_capped() {
        let model = BehaviorModel::ConstantAcceleration {
            acceleration: 4.0,
            max_velocity: 12.0,
        };
        let mut state = AgentState::new(0.0, 0.0, 0.0, 10.0);
        for _ in 0..10 {
            state = model.plan(&state, 0.2);
        }
        assert_eq!(state.velocity, 12.0);
    }

    #[test]
    fn test_stationary_stops() {
        let state = AgentState::new(1.0, 2.0, 0.3, 8.0);
        let next = BehaviorModel::Stationary.plan(&state, 1.0);
        assert_eq!((next.x, next.y, next.velocity), (1.0, 2.0, 0.0));
    }

    #[test]
    fn test_world_step_advances_time_and_agents() {
        let mut world = World::new(Bounds::new(0.0, 100.0, 0.0, 10.0)).with_ego(1);
        world.add_agent(Agent::new(1, AgentState::new(0.0, 5.0, 0.0, 10.0), BehaviorModel::ConstantVelocity));
        world.step(0.2);
        world.step(0.2);
        assert!((world.time() - 0.4).abs() < 1e-9);
        assert!((world.ego().unwrap().state.x - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_behavior_unknown_agent() {
        let mut world = World::new(Bounds::new(0.0, 1.0, 0.0, 1.0));
        assert!(world.set_behavior(9, BehaviorModel::Stationary).is_err());
    }

    #[test]
    fn test_bounds_relations() {
        let outer = Bounds::new(0.0, 10.0, 0.0, 10.0);
        let inner = Bounds::new(2.0, 3.0, 2.0, 3.0);
        let apart = Bounds::new(20.0, 30.0, 0.0, 1.0);
        assert!(outer.contains(&inner));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&apart));
        assert_eq!(Bounds::new(5.0, 1.0, 0.0, 2.0).x_min, 1.0);
    }
}
