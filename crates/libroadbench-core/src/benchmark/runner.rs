//! Sequential benchmark runner

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{BehaviorConfig, BenchmarkConfig};
use super::database::BenchmarkDatabase;
use super::result::{BenchmarkResult, ResultRow};
use crate::error::CoreError;
use crate::evaluation::{
    evaluate_all, triggered_conditions, validate_terminal_conditions, EvaluatorSet,
    TerminalConditions,
};
use crate::Result;

/// Per-episode limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Episode ends after this many steps if no terminal condition fired
    pub max_steps: u64,
    /// Simulated seconds per step
    pub step_time: f64,
}

impl RunSettings {
    /// `step_time` must be finite and positive, `max_steps` at least 1
    pub fn validate(&self) -> Result<()> {
        if !(self.step_time.is_finite() && self.step_time > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "step_time must be finite and positive, got {}",
                self.step_time
            )));
        }
        if self.max_steps == 0 {
            return Err(CoreError::InvalidConfig("max_steps must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_steps: 200,
            step_time: 0.2,
        }
    }
}

/// Progress hooks called by [`BenchmarkRunner::run_observed`]
pub trait RunObserver: Send + Sync {
    fn on_config_started(&self, _config: &BenchmarkConfig) {}

    fn on_config_finished(&self, _config: &BenchmarkConfig, _row: &ResultRow, _elapsed: Duration) {}

    /// Checked before each config; `true` aborts the run with [`CoreError::Cancelled`]
    fn should_stop(&self) -> bool {
        false
    }
}

/// Observer that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Runs benchmark configs one after another
#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    evaluators: EvaluatorSet,
    terminal_when: TerminalConditions,
    configs: Vec<BenchmarkConfig>,
    settings: RunSettings,
}

impl BenchmarkRunner {
    pub fn new(
        evaluators: EvaluatorSet,
        terminal_when: TerminalConditions,
        configs: Vec<BenchmarkConfig>,
    ) -> Result<Self> {
        validate_terminal_conditions(&evaluators, &terminal_when)?;
        Ok(Self {
            evaluators,
            terminal_when,
            configs,
            settings: RunSettings::default(),
        })
    }

    /// Runner over the database cross product of scenarios and behaviors
    pub fn from_database(
        database: &BenchmarkDatabase,
        evaluators: EvaluatorSet,
        terminal_when: TerminalConditions,
        behaviors: &[BehaviorConfig],
        num_scenarios: Option<usize>,
    ) -> Result<Self> {
        let configs = database.benchmark_configs(behaviors, num_scenarios);
        Self::new(evaluators, terminal_when, configs)
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn configs(&self) -> &[BenchmarkConfig] {
        &self.configs
    }

    pub fn evaluators(&self) -> &EvaluatorSet {
        &self.evaluators
    }

    pub fn terminal_when(&self) -> &TerminalConditions {
        &self.terminal_when
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every config
    pub fn run(&self) -> Result<BenchmarkResult> {
        self.run_observed(&NoopObserver)
    }

    /// Run every config, reporting progress to `observer`
    pub fn run_observed(&self, observer: &dyn RunObserver) -> Result<BenchmarkResult> {
        info!(configs = self.configs.len(), "Running benchmark configs");
        let mut rows = Vec::with_capacity(self.configs.len());

        for config in &self.configs {
            if observer.should_stop() {
                info!(completed = rows.len(), "Benchmark run cancelled");
                return Err(CoreError::Cancelled);
            }

            observer.on_config_started(config);
            let start = Instant::now();
            let row = self.run_config(config)?;
            observer.on_config_finished(config, &row, start.elapsed());
            rows.push(row);
        }

        Ok(BenchmarkResult::new(rows, self.configs.clone()))
    }

    /// Run a single config until a terminal condition holds or `max_steps` is hit
    pub fn run_config(&self, config: &BenchmarkConfig) -> Result<ResultRow> {
        self.settings.validate()?;

        let mut world = config.scenario.build_world();
        world.set_behavior(config.scenario.ego_id, config.behavior_config.model.clone())?;

        let mut step = 0;
        let (evaluations, terminal) = loop {
            world.step(self.settings.step_time);
            step += 1;

            let values = evaluate_all(&self.evaluators, &world, step);
            let triggered = triggered_conditions(&self.terminal_when, &values);
            if !triggered.is_empty() || step >= self.settings.max_steps {
                break (values, triggered);
            }
        };

        debug!(
            config_idx = config.config_idx,
            behavior = %config.behavior_config.name,
            step,
            terminal = ?terminal,
            "Config finished"
        );

        Ok(ResultRow {
            config_idx: config.config_idx,
            scen_set: config.scenario_set_name.clone(),
            scen_idx: config.scenario_idx,
            behavior: config.behavior_config.name.clone(),
            step,
            max_steps_reached: terminal.is_empty(),
            terminal,
            evaluations,
        })
    }
}
