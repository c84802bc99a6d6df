//! Benchmark configuration

use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;
use crate::world::BehaviorModel;

/// A named behavior model applied to the ego agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub name: String,
    pub model: BehaviorModel,
}

impl BehaviorConfig {
    pub fn new(name: impl Into<String>, model: BehaviorModel) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

/// One unit of benchmark work: a scenario driven by one behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Position of the config in the full benchmark (unique per run)
    pub config_idx: usize,
    pub behavior_config: BehaviorConfig,
    pub scenario: Scenario,
    /// Index of the scenario within its set
    pub scenario_idx: usize,
    pub scenario_set_name: String,
}

impl BenchmarkConfig {
    pub fn behavior_name(&self) -> &str {
        &self.behavior_config.name
    }
}
