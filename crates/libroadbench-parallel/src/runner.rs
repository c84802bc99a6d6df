//! Parallel benchmark runner

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use libroadbench_core::evaluation::{validate_terminal_conditions, EvaluatorSet, TerminalConditions};
use libroadbench_core::{BehaviorConfig, BenchmarkConfig, BenchmarkDatabase, BenchmarkResult, RunSettings};
use tracing::info;

use crate::error::ParallelError;
use crate::metrics::MetricsCollector;
use crate::pool::{WorkerBackend, WorkerPool};
use crate::shard::{available_workers, resolve_worker_count, round_robin};
use crate::worker::BenchmarkWorker;
use crate::Result;

/// Splits benchmark configs round-robin over a fixed number of workers and
/// merges their results in worker order
#[derive(Debug, Clone)]
pub struct ParallelBenchmarkRunner {
    evaluators: EvaluatorSet,
    terminal_when: TerminalConditions,
    configs: Vec<BenchmarkConfig>,
    settings: RunSettings,
    num_workers: usize,
    backend: WorkerBackend,
}

impl ParallelBenchmarkRunner {
    /// `num_workers` is clamped to the available processors; `None` uses all
    pub fn new(
        evaluators: EvaluatorSet,
        terminal_when: TerminalConditions,
        configs: Vec<BenchmarkConfig>,
        num_workers: Option<usize>,
    ) -> Result<Self> {
        validate_terminal_conditions(&evaluators, &terminal_when)?;
        let requested = num_workers;
        let available = available_workers();
        let num_workers = resolve_worker_count(requested, available);
        info!(
            requested = ?requested,
            available,
            workers = num_workers,
            configs = configs.len(),
            "Sized worker pool"
        );

        Ok(Self {
            evaluators,
            terminal_when,
            configs,
            settings: RunSettings::default(),
            num_workers,
            backend: WorkerBackend::Threads,
        })
    }

    pub fn from_database(
        database: &BenchmarkDatabase,
        evaluators: EvaluatorSet,
        terminal_when: TerminalConditions,
        behaviors: &[BehaviorConfig],
        num_scenarios: Option<usize>,
        num_workers: Option<usize>,
    ) -> Result<Self> {
        let configs = database.benchmark_configs(behaviors, num_scenarios);
        Self::new(evaluators, terminal_when, configs, num_workers)
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_backend(mut self, backend: WorkerBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn configs(&self) -> &[BenchmarkConfig] {
        &self.configs
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn backend(&self) -> &WorkerBackend {
        &self.backend
    }

    /// Configs dealt to each worker
    pub fn shards(&self) -> Vec<Vec<BenchmarkConfig>> {
        round_robin(self.configs.clone(), self.num_workers)
    }

    /// One worker per shard, each with its own sequential runner
    pub fn workers(&self) -> Result<Vec<BenchmarkWorker>> {
        self.shards()
            .into_iter()
            .enumerate()
            .map(|(id, shard)| {
                BenchmarkWorker::new(
                    id,
                    self.evaluators.clone(),
                    self.terminal_when.clone(),
                    self.settings,
                    shard,
                )
            })
            .collect()
    }

    /// Run every config
    pub fn run(&self) -> Result<BenchmarkResult> {
        let metrics = Arc::new(MetricsCollector::new(self.configs.len(), self.num_workers));
        self.run_with(metrics, Arc::new(AtomicBool::new(false)))
    }

    /// Run every config, reporting into `metrics`; setting `stop` cancels the run
    pub fn run_with(&self, metrics: Arc<MetricsCollector>, stop: Arc<AtomicBool>) -> Result<BenchmarkResult> {
        let workers = self.workers()?;
        metrics.set_total_configs(self.configs.len());
        metrics.log_event(format!(
            "Started {} workers on {} configs ({})",
            workers.len(),
            self.configs.len(),
            self.backend.as_str()
        ));

        let mut pool = WorkerPool::acquire(self.backend.clone(), Arc::clone(&metrics), stop);
        for worker in workers {
            pool.dispatch(worker)?;
        }
        let parts = pool.collect()?;
        pool.release();

        let dispatched = self.configs.len();
        let merged = BenchmarkResult::merge(parts);
        if merged.len() != dispatched {
            return Err(ParallelError::ResultCount {
                expected: dispatched,
                actual: merged.len(),
            });
        }
        if merged.benchmark_configs().len() != dispatched {
            return Err(ParallelError::ResultCount {
                expected: dispatched,
                actual: merged.benchmark_configs().len(),
            });
        }

        metrics.log_event(format!("Benchmark complete: {} configs", merged.len()));
        info!(configs = merged.len(), workers = self.num_workers, "Parallel run finished");
        Ok(merged)
    }
}
