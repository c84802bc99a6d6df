//! roadbench - parallel benchmark runner for driving behavior models
//!
//! Subcommands:
//! - `run`: shard a benchmark suite over workers, with a live TUI or headless
//! - `worker`: child-process entry point speaking the wire protocol on stdin/stdout
//! - `scenario`: step a few generated scenarios and draw them
//! - `generate`: write a generated scenario set to disk

mod app;
mod cli;
mod commands;
mod error;
mod ui;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command};
use error::Result;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports and, for workers, frames
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run_command(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Run(args) => commands::run::run(args),
        Command::Worker => commands::worker::run(),
        Command::Scenario(args) => commands::scenario::run(args),
        Command::Generate(args) => commands::generate::run(args),
    }
}
