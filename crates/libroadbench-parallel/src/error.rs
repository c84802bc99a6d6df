//! Parallel execution error types

use thiserror::Error;

/// Errors that can occur while running shards in parallel
#[derive(Error, Debug)]
pub enum ParallelError {
    /// A worker reported an error or panicked
    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    /// A worker process exited without delivering a result
    #[error("Worker {worker} exited without a result ({status}){stderr}")]
    WorkerExited {
        worker: usize,
        status: String,
        stderr: String,
    },

    /// Failed to spawn a worker
    #[error("Failed to spawn worker {worker}: {message}")]
    Spawn { worker: usize, message: String },

    /// Malformed frame on the wire
    #[error("Wire protocol error: {0}")]
    Protocol(String),

    /// Wire format version mismatch
    #[error("Wire version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u16, actual: u16 },

    /// CBOR encode/decode error
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// Merged result does not cover every input config
    #[error("Result count mismatch: {expected} configs dispatched, {actual} returned")]
    ResultCount { expected: usize, actual: usize },

    /// Core error
    #[error("{0}")]
    Core(#[from] libroadbench_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParallelError {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            ParallelError::Core(e) => e.exit_code(),
            ParallelError::WorkerFailed { .. } | ParallelError::WorkerExited { .. } => 4,
            ParallelError::Spawn { .. } => 4,
            ParallelError::Protocol(_) | ParallelError::VersionMismatch { .. } | ParallelError::Cbor(_) => 6,
            ParallelError::ResultCount { .. } => 1,
            ParallelError::Io(_) => 5,
        }
    }
}
