//! Scenario set generation

use libroadbench_core::params::KEY_SEPARATOR;
use libroadbench_core::scenario::GENERATION_PARAMS;
use libroadbench_core::{ConfigurableScenarioGeneration, ParameterServer};
use tracing::info;

use crate::cli::GenerateArgs;
use crate::error::Result;

pub fn run(args: &GenerateArgs) -> Result<()> {
    let mut params = match &args.params {
        Some(path) => ParameterServer::load(path)?,
        None => ParameterServer::new(),
    };
    if let Some(name) = &args.name {
        params.set(&format!("{}{}set_name", GENERATION_PARAMS, KEY_SEPARATOR), name)?;
    }

    let set = ConfigurableScenarioGeneration::new(args.num_scenarios, &mut params)?.into_set();
    set.dump(&args.out)?;
    info!(set = %set.name, path = %args.out.display(), "Scenario set written");

    println!(
        "Wrote {} scenarios of set '{}' to {}",
        set.scenarios.len(),
        set.name,
        args.out.display()
    );
    Ok(())
}
