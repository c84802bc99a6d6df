//! Benchmark database: scenario sets stored as files in one directory

use std::path::Path;

use tracing::{debug, warn};

use super::config::{BehaviorConfig, BenchmarkConfig};
use crate::error::CoreError;
use crate::scenario::{ScenarioSet, SCENARIO_SET_EXTENSION};
use crate::Result;

/// Collection of scenario sets to benchmark against
#[derive(Debug, Clone, Default)]
pub struct BenchmarkDatabase {
    sets: Vec<ScenarioSet>,
}

impl BenchmarkDatabase {
    pub fn from_sets(sets: Vec<ScenarioSet>) -> Self {
        Self { sets }
    }

    /// Load every scenario-set file in `dir`, ordered by file name
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!(
                "Benchmark database directory '{}' not found",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_set = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(SCENARIO_SET_EXTENSION);
            if is_set {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "Skipping non scenario-set entry");
            }
        }
        paths.sort();

        let sets = paths
            .iter()
            .map(|path| ScenarioSet::load(path))
            .collect::<Result<Vec<_>>>()?;

        if sets.is_empty() {
            warn!(dir = %dir.display(), "Benchmark database is empty");
        }
        Ok(Self { sets })
    }

    /// Write every set into `dir` as `<name>.json`
    pub fn dump_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for set in &self.sets {
            set.dump(&dir.join(format!("{}.{}", set.name, SCENARIO_SET_EXTENSION)))?;
        }
        Ok(())
    }

    pub fn sets(&self) -> &[ScenarioSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Cross product set × scenario × behavior, numbered from 0
    ///
    /// `num_scenarios` limits each set to its first N scenarios.
    pub fn benchmark_configs(
        &self,
        behaviors: &[BehaviorConfig],
        num_scenarios: Option<usize>,
    ) -> Vec<BenchmarkConfig> {
        let mut configs = Vec::new();
        for set in &self.sets {
            let limit = num_scenarios.unwrap_or(set.scenarios.len());
            for (scenario_idx, scenario) in set.scenarios.iter().take(limit).enumerate() {
                for behavior in behaviors {
                    configs.push(BenchmarkConfig {
                        config_idx: configs.len(),
                        behavior_config: behavior.clone(),
                        scenario: scenario.clone(),
                        scenario_idx,
                        scenario_set_name: set.name.clone(),
                    });
                }
            }
        }
        configs
    }
}
