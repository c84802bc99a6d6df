//! Scenario runner: generate a few scenarios, reset and step them while drawing

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use libroadbench_core::{AsciiViewer, ConfigurableScenarioGeneration, ParameterServer, Runtime};
use tracing::info;

use crate::cli::ScenarioArgs;
use crate::error::{CliError, Result};

/// Fixed display window; the viewer follows the world bounds when they are known
const VIEW_X_RANGE: (f64, f64) = (5060.0, 5160.0);
const VIEW_Y_RANGE: (f64, f64) = (5070.0, 5150.0);

pub fn run(args: &ScenarioArgs) -> Result<()> {
    let mut params = ParameterServer::load(&args.params)?;
    let generation = ConfigurableScenarioGeneration::new(args.num_scenarios, &mut params)?;
    let viewer = AsciiViewer::new(io::stdout(), &mut params, VIEW_X_RANGE, VIEW_Y_RANGE, true)?;

    let (step_time, real_time_factor) = {
        let mut simulation = params.scope("simulation");
        let step_time: f64 = simulation.get_or("step_time", "Simulated seconds per step", 0.2)?;
        let real_time_factor: f64 = simulation.get_or(
            "real_time_factor",
            "Simulated seconds per wall-clock second; 0 runs unpaced",
            1.0,
        )?;
        (step_time, real_time_factor)
    };
    if !(step_time.is_finite() && step_time > 0.0) {
        return Err(CliError::Config(format!(
            "simulation::step_time must be finite and positive, got {}",
            step_time
        )));
    }

    let pace = if !args.no_pacing && real_time_factor > 0.0 {
        let pace = Duration::try_from_secs_f64(step_time / real_time_factor).map_err(|e| {
            CliError::Config(format!(
                "cannot pace step_time {} at real_time_factor {}: {}",
                step_time, real_time_factor, e
            ))
        })?;
        Some(pace)
    } else {
        None
    };

    let mut runtime = Runtime::new(step_time, viewer, generation, true);
    runtime.reset()?;
    for _ in 0..args.steps {
        let start = Instant::now();
        runtime.step()?;
        if let Some(rest) = pace.and_then(|pace| pace.checked_sub(start.elapsed())) {
            thread::sleep(rest);
        }
    }
    info!(steps = runtime.steps(), scenario = ?runtime.current_scenario(), "Scenario run finished");

    if let Some(path) = &args.save_params {
        params.save(path)?;
        println!("Parameters saved to {}", path.display());
    }
    Ok(())
}
