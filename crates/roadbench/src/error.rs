//! Error types for the roadbench CLI

use libroadbench_core::CoreError;
use libroadbench_parallel::ParallelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Parallel(#[from] ParallelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => e.exit_code(),
            CliError::Parallel(e) => e.exit_code(),
            CliError::Io(_) => 5,
            CliError::Json(_) => 1,
            CliError::Config(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
