//! Parallel benchmark execution for roadbench
//!
//! This crate provides:
//! - Worker sizing and round-robin sharding of benchmark configs
//! - The framed CBOR wire format spoken between orchestrator and worker processes
//! - A scoped worker pool running shards on threads or child processes
//! - The parallel benchmark runner and its live metrics

pub mod error;
pub mod metrics;
pub mod pool;
pub mod runner;
pub mod shard;
pub mod wire;
pub mod worker;

pub use error::ParallelError;
pub use metrics::{LatencyPercentiles, MetricsCollector, MetricsSnapshot, WorkerMetrics, WorkerStatus};
pub use pool::{WorkerBackend, WorkerPool};
pub use runner::ParallelBenchmarkRunner;
pub use shard::{available_workers, resolve_worker_count, round_robin};
pub use wire::{WorkerJob, WorkerMessage};
pub use worker::{serve_job, BenchmarkWorker};

/// Current wire format version
pub const WIRE_VERSION: u16 = 1;

/// Name of the CLI subcommand that serves a worker job on stdin/stdout
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Result alias for parallel operations
pub type Result<T> = std::result::Result<T, ParallelError>;
