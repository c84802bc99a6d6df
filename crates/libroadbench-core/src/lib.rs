//! Core library for roadbench
//!
//! This crate provides:
//! - A hierarchical parameter store backed by JSON files (ParameterServer)
//! - A kinematic world, scenario sets and a seeded scenario generator
//! - Evaluators and terminal predicates
//! - A stepping runtime with pluggable viewers
//! - Benchmark configs, databases, results and the sequential runner

pub mod benchmark;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod params;
pub mod runtime;
pub mod scenario;
pub mod viewer;
pub mod world;

pub use benchmark::{
    BehaviorConfig, BenchmarkConfig, BenchmarkDatabase, BenchmarkResult, BenchmarkRunner,
    BehaviorSummary, NoopObserver, ResultRow, RunObserver, RunSettings,
};
pub use config::{load_suite_config, save_suite_config, SuiteConfig};
pub use error::CoreError;
pub use evaluation::{EvalValue, EvaluatorKind, EvaluatorSet, Predicate, TerminalConditions};
pub use params::ParameterServer;
pub use runtime::Runtime;
pub use scenario::{ConfigurableScenarioGeneration, Scenario, ScenarioGeneration, ScenarioSet};
pub use viewer::{AsciiViewer, NullViewer, Viewer};
pub use world::{Agent, AgentId, AgentState, BehaviorModel, Bounds, World};

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, CoreError>;
