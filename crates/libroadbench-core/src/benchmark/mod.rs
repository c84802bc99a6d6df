//! Benchmark module

pub mod config;
pub mod database;
pub mod result;
pub mod runner;

pub use config::{BehaviorConfig, BenchmarkConfig};
pub use database::BenchmarkDatabase;
pub use result::{BehaviorSummary, BenchmarkResult, ResultRow};
pub use runner::{BenchmarkRunner, NoopObserver, RunObserver, RunSettings};
