use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "roadbench")]
#[command(about = "Parallel benchmark runner for driving behavior models on traffic scenarios")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a benchmark suite over a scenario database
    Run(RunArgs),

    /// Serve one worker job read from stdin (used by the process backend)
    #[command(hide = true)]
    Worker,

    /// Step generated scenarios and draw them
    Scenario(ScenarioArgs),

    /// Generate a scenario set file
    Generate(GenerateArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Benchmark suite (TOML)
    #[arg(short = 's', long)]
    pub suite: PathBuf,

    /// Directory of scenario set files
    #[arg(short = 'd', long)]
    pub database: PathBuf,

    /// Number of workers (clamped to available processors)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Where workers run
    #[arg(long, value_enum, default_value_t = Backend::Threads)]
    pub backend: Backend,

    /// Output JSON metrics report to file
    #[arg(short = 'j', long)]
    pub json_report: Option<PathBuf>,

    /// Output the benchmark result (rows and configs) as JSON
    #[arg(short = 'r', long)]
    pub result: Option<PathBuf>,

    /// Non-interactive mode (no TUI)
    #[arg(long)]
    pub headless: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// One thread per worker
    Threads,
    /// One child process per worker
    Process,
}

#[derive(Args, Clone, Debug)]
pub struct ScenarioArgs {
    /// Parameter file
    #[arg(short = 'p', long, default_value = "params/highway_merge_configurable.json")]
    pub params: PathBuf,

    /// Number of scenarios to generate
    #[arg(short = 'n', long, default_value_t = 3)]
    pub num_scenarios: usize,

    /// Steps to simulate after the reset
    #[arg(long, default_value_t = 5)]
    pub steps: u64,

    /// Do not pace steps to wall-clock time
    #[arg(long)]
    pub no_pacing: bool,

    /// Write the parameters, defaults included, to this file afterwards
    #[arg(long)]
    pub save_params: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Parameter file (built-in defaults when omitted)
    #[arg(short = 'p', long)]
    pub params: Option<PathBuf>,

    /// Number of scenarios to generate
    #[arg(short = 'n', long, default_value_t = 3)]
    pub num_scenarios: usize,

    /// Scenario set name (overrides the parameter file)
    #[arg(long)]
    pub name: Option<String>,

    /// Output file
    #[arg(short = 'o', long)]
    pub out: PathBuf,
}
