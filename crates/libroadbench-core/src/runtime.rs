//! Stepping runtime: scenario generation + world + viewer

use tracing::debug;

use crate::error::CoreError;
use crate::scenario::ScenarioGeneration;
use crate::viewer::Viewer;
use crate::world::World;
use crate::Result;

/// Steps scenarios taken from a generator, optionally rendering each frame
pub struct Runtime<G, V> {
    step_time: f64,
    viewer: V,
    scenario_generation: G,
    render: bool,
    world: Option<World>,
    next_scenario: usize,
    current_scenario: Option<usize>,
    steps: u64,
}

impl<G: ScenarioGeneration, V: Viewer> Runtime<G, V> {
    pub fn new(step_time: f64, viewer: V, scenario_generation: G, render: bool) -> Self {
        Self {
            step_time,
            viewer,
            scenario_generation,
            render,
            world: None,
            next_scenario: 0,
            current_scenario: None,
            steps: 0,
        }
    }

    /// Load the next scenario (cycling through the generator)
    pub fn reset(&mut self) -> Result<()> {
        let count = self.scenario_generation.num_scenarios();
        if count == 0 {
            return Err(CoreError::InvalidConfig(
                "scenario generation produced no scenarios".to_string(),
            ));
        }

        let idx = self.next_scenario % count;
        let scenario = self
            .scenario_generation
            .get_scenario(idx)
            .ok_or_else(|| CoreError::NotFound(format!("Scenario {} not found", idx)))?;

        self.world = Some(scenario.build_world());
        self.current_scenario = Some(idx);
        self.next_scenario = idx + 1;
        self.steps = 0;
        debug!(scenario = idx, "Runtime reset");

        self.render_frame()
    }

    /// Advance the world by one step
    pub fn step(&mut self) -> Result<()> {
        let world = self.world.as_mut().ok_or(CoreError::NotReset)?;
        world.step(self.step_time);
        self.steps += 1;
        self.render_frame()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn step_time(&self) -> f64 {
        self.step_time
    }

    /// Steps since the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Index of the scenario loaded by the last reset
    pub fn current_scenario(&self) -> Option<usize> {
        self.current_scenario
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn into_viewer(self) -> V {
        self.viewer
    }

    fn render_frame(&mut self) -> Result<()> {
        if !self.render {
            return Ok(());
        }
        match &self.world {
            Some(world) => self.viewer.draw_world(world),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterServer;
    use crate::scenario::{ConfigurableScenarioGeneration, ScenarioSet};
    use crate::viewer::NullViewer;

    /// Viewer counting frames
    #[derive(Default)]
    struct CountingViewer {
        frames: usize,
    }

    impl Viewer for CountingViewer {
        fn draw_world(&mut self, _world: &World) -> Result<()> {
            self.frames += 1;
            Ok(())
        }
    }

    fn generation(count: usize) -> ConfigurableScenarioGeneration {
        let mut params = ParameterServer::new();
        ConfigurableScenarioGeneration::new(count, &mut params).unwrap()
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut runtime = Runtime::new(0.2, NullViewer, generation(1), false);
        assert!(matches!(runtime.step(), Err(CoreError::NotReset)));
    }

    #[test]
    fn test_reset_and_step_renders_every_frame() {
        let mut runtime = Runtime::new(0.2, CountingViewer::default(), generation(3), true);
        runtime.reset().unwrap();
        for _ in 0..5 {
            runtime.step().unwrap();
        }
        assert_eq!(runtime.steps(), 5);
        assert_eq!(runtime.viewer().frames, 6);
        assert!((runtime.world().unwrap().time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_cycles_scenarios() {
        let mut runtime = Runtime::new(0.2, NullViewer, generation(2), false);
        let mut seen = Vec::new();
        for _ in 0..3 {
            runtime.reset().unwrap();
            seen.push(runtime.current_scenario().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 0]);
    }

    #[test]
    fn test_render_disabled() {
        let mut runtime = Runtime::new(0.2, CountingViewer::default(), generation(1), false);
        runtime.reset().unwrap();
        runtime.step().unwrap();
        assert_eq!(runtime.into_viewer().frames, 0);
    }

    #[test]
    fn test_empty_generator_rejected() {
        let mut runtime = Runtime::new(0.2, NullViewer, ScenarioSet::new("empty", Vec::new()), false);
        assert!(runtime.reset().is_err());
    }
}
