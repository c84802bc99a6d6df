//! Benchmark workers
//!
//! A [`BenchmarkWorker`] owns one shard: a sequential [`BenchmarkRunner`] built
//! from the shared evaluator and terminal settings plus its own configs. In the
//! process backend the same worker is rebuilt inside a child from a
//! [`WorkerJob`] frame by [`serve_job`].

use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::Duration;

use libroadbench_core::evaluation::{EvaluatorSet, TerminalConditions};
use libroadbench_core::{
    BenchmarkConfig, BenchmarkResult, BenchmarkRunner, ResultRow, RunObserver, RunSettings,
};
use tracing::{debug, info, warn};

use crate::error::ParallelError;
use crate::wire::{read_frame, write_frame, WorkerJob, WorkerMessage};
use crate::Result;

/// One shard of a parallel run
#[derive(Debug, Clone)]
pub struct BenchmarkWorker {
    id: usize,
    runner: BenchmarkRunner,
}

impl BenchmarkWorker {
    pub fn new(
        id: usize,
        evaluators: EvaluatorSet,
        terminal_when: TerminalConditions,
        settings: RunSettings,
        configs: Vec<BenchmarkConfig>,
    ) -> Result<Self> {
        let runner = BenchmarkRunner::new(evaluators, terminal_when, configs)?.with_settings(settings);
        Ok(Self { id, runner })
    }

    /// Rebuild a worker from the job it was shipped as
    pub fn from_job(job: WorkerJob) -> Result<Self> {
        Self::new(
            job.worker_id,
            job.evaluators,
            job.terminal_when,
            job.settings,
            job.configs,
        )
    }

    /// The job that recreates this worker in another process
    pub fn to_job(&self) -> WorkerJob {
        WorkerJob {
            worker_id: self.id,
            evaluators: self.runner.evaluators().clone(),
            terminal_when: self.runner.terminal_when().clone(),
            settings: *self.runner.settings(),
            configs: self.runner.configs().to_vec(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn configs(&self) -> &[BenchmarkConfig] {
        self.runner.configs()
    }

    pub fn runner(&self) -> &BenchmarkRunner {
        &self.runner
    }

    /// Run the shard; an empty shard yields an empty result
    pub fn run(&self, observer: &dyn RunObserver) -> Result<BenchmarkResult> {
        debug!(worker = self.id, configs = self.configs().len(), "Worker starting");
        let result = self.runner.run_observed(observer)?;
        debug!(worker = self.id, rows = result.len(), "Worker finished");
        Ok(result)
    }
}

/// Streams progress frames to the orchestrator
struct FrameObserver<'a, W: Write + Send> {
    worker_id: usize,
    output: &'a Mutex<W>,
}

impl<W: Write + Send> FrameObserver<'_, W> {
    fn send(&self, message: &WorkerMessage) -> Result<()> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| ParallelError::Protocol("Output lock poisoned".to_string()))?;
        write_frame(&mut *output, message)
    }
}

impl<W: Write + Send> RunObserver for FrameObserver<'_, W> {
    fn on_config_finished(&self, config: &BenchmarkConfig, row: &ResultRow, elapsed: Duration) {
        let message = WorkerMessage::ConfigFinished {
            worker_id: self.worker_id,
            config_idx: config.config_idx,
            steps: row.step,
            terminal: !row.max_steps_reached,
            elapsed_us: elapsed.as_micros() as u64,
        };
        if let Err(e) = self.send(&message) {
            warn!(worker = self.worker_id, error = %e, "Failed to report progress");
        }
    }
}

/// Serve one worker job: read a [`WorkerJob`] frame from `input`, run it and
/// answer on `output` with `Started`, one `ConfigFinished` per config and a
/// final `Finished` or `Failed`
pub fn serve_job<R: Read, W: Write + Send>(input: &mut R, output: W) -> Result<()> {
    let job: WorkerJob = read_frame(input)?
        .ok_or_else(|| ParallelError::Protocol("No job frame on input".to_string()))?;
    let worker_id = job.worker_id;
    let output = Mutex::new(output);
    let observer = FrameObserver {
        worker_id,
        output: &output,
    };

    let outcome = BenchmarkWorker::from_job(job).and_then(|worker| {
        info!(worker = worker_id, configs = worker.configs().len(), "Serving worker job");
        observer.send(&WorkerMessage::Started {
            worker_id,
            configs: worker.configs().len(),
        })?;
        worker.run(&observer)
    });

    match outcome {
        Ok(result) => observer.send(&WorkerMessage::Finished { worker_id, result }),
        Err(e) => {
            observer.send(&WorkerMessage::Failed {
                worker_id,
                message: e.to_string(),
            })?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::encode_frame;
    use libroadbench_core::evaluation::{EvaluatorKind, Predicate};
    use libroadbench_core::{
        Agent, AgentState, BehaviorConfig, BehaviorModel, Bounds, NoopObserver, Scenario,
    };

    fn free_road(config_idx: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            config_idx,
            behavior_config: BehaviorConfig::new("cv", BehaviorModel::ConstantVelocity),
            scenario: Scenario {
                agents: vec![Agent::new(1, AgentState::new(0.0, 1.75, 0.0, 10.0), BehaviorModel::ConstantVelocity)],
                ego_id: 1,
                goal: Bounds::new(40.0, 50.0, 0.0, 3.5),
                map_bounds: Bounds::new(-10.0, 200.0, 0.0, 3.5),
            },
            scenario_idx: config_idx,
            scenario_set_name: "free_road".to_string(),
        }
    }

    fn settings() -> (EvaluatorSet, TerminalConditions) {
        let mut evaluators = EvaluatorSet::new();
        evaluators.insert("success".to_string(), EvaluatorKind::GoalReached);
        evaluators.insert("step".to_string(), EvaluatorKind::StepCount);
        let mut terminal_when = TerminalConditions::new();
        terminal_when.insert("success".to_string(), Predicate::IsTrue);
        (evaluators, terminal_when)
    }

    fn worker(id: usize, configs: Vec<BenchmarkConfig>) -> BenchmarkWorker {
        let (evaluators, terminal_when) = settings();
        BenchmarkWorker::new(id, evaluators, terminal_when, RunSettings::default(), configs).unwrap()
    }

    fn read_all(mut data: &[u8]) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = read_frame(&mut data).unwrap() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn test_empty_shard_runs() {
        let result = worker(2, Vec::new()).run(&NoopObserver).unwrap();
        assert!(result.is_empty());
        assert!(result.benchmark_configs().is_empty());
    }

    #[test]
    fn test_job_rebuilds_worker() {
        let original = worker(1, vec![free_road(1), free_road(4)]);
        let rebuilt = BenchmarkWorker::from_job(original.to_job()).unwrap();
        assert_eq!(rebuilt.id(), 1);
        assert_eq!(rebuilt.configs(), original.configs());
        assert_eq!(rebuilt.run(&NoopObserver).unwrap(), original.run(&NoopObserver).unwrap());
    }

    #[test]
    fn test_serve_job_streams_progress() {
        let job = worker(0, vec![free_road(0), free_road(3)]).to_job();
        let input = encode_frame(&job).unwrap();
        let mut output = Vec::new();
        serve_job(&mut input.as_slice(), &mut output).unwrap();

        let messages = read_all(&output);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], WorkerMessage::Started { worker_id: 0, configs: 2 });
        assert!(matches!(
            messages[1],
            WorkerMessage::ConfigFinished { config_idx: 0, terminal: true, .. }
        ));
        assert!(matches!(
            messages[2],
            WorkerMessage::ConfigFinished { config_idx: 3, terminal: true, .. }
        ));
        match &messages[3] {
            WorkerMessage::Finished { worker_id, result } => {
                assert_eq!(*worker_id, 0);
                assert_eq!(result.len(), 2);
                assert_eq!(result.result_rows()[1].config_idx, 3);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_serve_job_reports_failure() {
        let mut job = worker(5, vec![free_road(0)]).to_job();
        job.settings.step_time = 0.0;
        let input = encode_frame(&job).unwrap();
        let mut output = Vec::new();
        assert!(serve_job(&mut input.as_slice(), &mut output).is_err());

        let messages = read_all(&output);
        assert!(matches!(
            messages.last(),
            Some(WorkerMessage::Failed { worker_id: 5, .. })
        ));
    }

    #[test]
    fn test_serve_job_without_input() {
        let mut output = Vec::new();
        let err = serve_job(&mut (&[] as &[u8]), &mut output).unwrap_err();
        assert!(matches!(err, ParallelError::Protocol(_)));
        assert!(output.is_empty());
    }
}
