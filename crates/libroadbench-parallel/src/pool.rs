//! Scoped worker pool
//!
//! A [`WorkerPool`] is acquired for one run, receives every worker through
//! [`WorkerPool::dispatch`], and blocks once in [`WorkerPool::collect`] until
//! all of them are done. Dropping the pool stops thread workers at the next
//! config boundary and kills any child process still running.

use std::any::Any;
use std::io::{BufReader, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use libroadbench_core::{BenchmarkConfig, BenchmarkResult, CoreError, ResultRow, RunObserver};
use tracing::{debug, info, warn};

use crate::error::ParallelError;
use crate::metrics::{MetricsCollector, WorkerStatus};
use crate::wire::{read_frame, write_frame, WorkerMessage};
use crate::worker::BenchmarkWorker;
use crate::{Result, WORKER_SUBCOMMAND};

/// Poll interval while waiting for workers
const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Bytes of worker stderr kept for error messages
const STDERR_TAIL: usize = 4096;

/// Where workers run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerBackend {
    /// One OS thread per worker
    Threads,
    /// One child process per worker, speaking the wire protocol on stdin/stdout
    Process { program: PathBuf, args: Vec<String> },
}

impl WorkerBackend {
    /// Child processes re-running the current executable's worker subcommand
    pub fn current_exe() -> Result<Self> {
        Ok(WorkerBackend::Process {
            program: std::env::current_exe()?,
            args: vec![WORKER_SUBCOMMAND.to_string()],
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerBackend::Threads => "threads",
            WorkerBackend::Process { .. } => "process",
        }
    }
}

/// Shared between the pool and each worker it dispatched
#[derive(Clone)]
struct WorkerContext {
    metrics: Arc<MetricsCollector>,
    /// Caller-owned stop request
    stop: Arc<AtomicBool>,
    /// Set by the first failing worker
    abort: Arc<AtomicBool>,
    first_failure: Arc<OnceLock<usize>>,
}

impl WorkerContext {
    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.abort.load(Ordering::Relaxed)
    }

    fn fail(&self, worker_id: usize, message: &str) {
        self.metrics.update_worker_status(worker_id, WorkerStatus::Failed);
        self.metrics.log_event(format!("Worker #{} failed: {}", worker_id, message));
        let _ = self.first_failure.set(worker_id);
        self.abort.store(true, Ordering::SeqCst);
    }

    fn complete(&self, worker_id: usize, rows: usize) {
        self.metrics.update_worker_status(worker_id, WorkerStatus::Complete);
        self.metrics.log_event(format!("Worker #{} completed {} configs", worker_id, rows));
    }
}

/// Feeds thread worker progress into the metrics collector
struct MetricsObserver {
    worker_id: usize,
    ctx: WorkerContext,
}

impl RunObserver for MetricsObserver {
    fn on_config_finished(&self, _config: &BenchmarkConfig, row: &ResultRow, elapsed: Duration) {
        self.ctx
            .metrics
            .record_config(self.worker_id, row.step, !row.max_steps_reached, elapsed);
    }

    fn should_stop(&self) -> bool {
        self.ctx.stopping()
    }
}

enum WorkerHandle {
    Thread {
        worker_id: usize,
        handle: Option<JoinHandle<Result<BenchmarkResult>>>,
    },
    Process {
        worker_id: usize,
        child: Child,
        reader: Option<JoinHandle<Result<Option<BenchmarkResult>>>>,
        stderr: Option<JoinHandle<String>>,
    },
}

impl WorkerHandle {
    fn worker_id(&self) -> usize {
        match self {
            WorkerHandle::Thread { worker_id, .. } | WorkerHandle::Process { worker_id, .. } => *worker_id,
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            WorkerHandle::Thread { handle, .. } => handle.as_ref().map_or(true, |h| h.is_finished()),
            WorkerHandle::Process { reader, .. } => reader.as_ref().map_or(true, |h| h.is_finished()),
        }
    }

    fn kill(&mut self) {
        if let WorkerHandle::Process { worker_id, child, .. } = self {
            if let Err(e) = child.kill() {
                debug!(worker = *worker_id, error = %e, "Worker process already gone");
            }
        }
    }

    /// Join the worker; the result of a dead process keeps its exit status and stderr
    fn join(&mut self, ctx: &WorkerContext) -> Result<BenchmarkResult> {
        match self {
            WorkerHandle::Thread { worker_id, handle } => match handle.take() {
                Some(handle) => handle.join().unwrap_or_else(|_| {
                    ctx.metrics.update_worker_status(*worker_id, WorkerStatus::Failed);
                    Err(ParallelError::WorkerFailed {
                        worker: *worker_id,
                        message: "worker thread panicked".to_string(),
                    })
                }),
                None => Err(CoreError::Cancelled.into()),
            },
            WorkerHandle::Process {
                worker_id,
                child,
                reader,
                stderr,
            } => {
                let outcome = match reader.take() {
                    Some(reader) => reader.join().unwrap_or_else(|_| {
                        Err(ParallelError::WorkerFailed {
                            worker: *worker_id,
                            message: "reader thread panicked".to_string(),
                        })
                    }),
                    None => Ok(None),
                };
                let status = child.wait();
                let stderr = stderr.take().and_then(|h| h.join().ok()).unwrap_or_default();

                match outcome? {
                    Some(result) => Ok(result),
                    None if ctx.stopping() && ctx.first_failure.get().copied() != Some(*worker_id) => {
                        Err(CoreError::Cancelled.into())
                    }
                    None => Err(ParallelError::WorkerExited {
                        worker: *worker_id,
                        status: match status {
                            Ok(status) => status.to_string(),
                            Err(e) => e.to_string(),
                        },
                        stderr: if stderr.trim().is_empty() {
                            String::new()
                        } else {
                            format!(": {}", stderr.trim())
                        },
                    }),
                }
            }
        }
    }
}

/// Handle owning the workers of one run
pub struct WorkerPool {
    backend: WorkerBackend,
    ctx: WorkerContext,
    handles: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Acquire a pool; `stop` lets the caller cancel the run from outside
    pub fn acquire(backend: WorkerBackend, metrics: Arc<MetricsCollector>, stop: Arc<AtomicBool>) -> Self {
        debug!(backend = backend.as_str(), "Acquiring worker pool");
        Self {
            backend,
            ctx: WorkerContext {
                metrics,
                stop,
                abort: Arc::new(AtomicBool::new(false)),
                first_failure: Arc::new(OnceLock::new()),
            },
            handles: Vec::new(),
        }
    }

    pub fn backend(&self) -> &WorkerBackend {
        &self.backend
    }

    /// Number of workers dispatched so far
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Start a worker without waiting for it
    pub fn dispatch(&mut self, worker: BenchmarkWorker) -> Result<()> {
        let worker_id = worker.id();
        self.ctx.metrics.set_worker_shard(worker_id, worker.configs().len());
        info!(
            worker = worker_id,
            configs = worker.configs().len(),
            backend = self.backend.as_str(),
            "Dispatching worker"
        );

        let handle = match &self.backend {
            WorkerBackend::Threads => self.spawn_thread(worker)?,
            WorkerBackend::Process { program, args } => self.spawn_process(worker, program, args)?,
        };
        self.handles.push(handle);
        Ok(())
    }

    fn spawn_thread(&self, worker: BenchmarkWorker) -> Result<WorkerHandle> {
        let worker_id = worker.id();
        let ctx = self.ctx.clone();

        let handle = thread::Builder::new()
            .name(format!("roadbench-worker-{}", worker_id))
            .spawn(move || {
                let observer = MetricsObserver {
                    worker_id,
                    ctx: ctx.clone(),
                };
                run_thread_worker(worker_id, &ctx, || worker.run(&observer))
            })
            .map_err(|e| ParallelError::Spawn {
                worker: worker_id,
                message: e.to_string(),
            })?;

        Ok(WorkerHandle::Thread {
            worker_id,
            handle: Some(handle),
        })
    }

    fn spawn_process(&self, worker: BenchmarkWorker, program: &Path, args: &[String]) -> Result<WorkerHandle> {
        let worker_id = worker.id();
        let spawn_err = |message: String| ParallelError::Spawn {
            worker: worker_id,
            message,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_err(format!("{}: {}", program.display(), e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdin = child.stdin.take();
        let (Some(stdout), Some(stderr), Some(mut stdin)) = (stdout, stderr, stdin) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_err("worker stdio not captured".to_string()));
        };

        let ctx = self.ctx.clone();
        let reader = thread::Builder::new()
            .name(format!("roadbench-reader-{}", worker_id))
            .spawn(move || read_worker_stream(worker_id, stdout, &ctx));
        let drain = thread::Builder::new()
            .name(format!("roadbench-stderr-{}", worker_id))
            .spawn(move || drain_stderr(stderr));

        let (reader, drain) = match (reader, drain) {
            (Ok(reader), Ok(drain)) => (reader, drain),
            (reader, drain) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.map(JoinHandle::join);
                let _ = drain.map(JoinHandle::join);
                return Err(spawn_err("failed to start worker I/O threads".to_string()));
            }
        };

        let mut handle = WorkerHandle::Process {
            worker_id,
            child,
            reader: Some(reader),
            stderr: Some(drain),
        };

        // Closing stdin after the job tells the worker there is nothing more to read
        if let Err(e) = write_frame(&mut stdin, &worker.to_job()) {
            handle.kill();
            let _ = handle.join(&self.ctx);
            return Err(spawn_err(format!("failed to send job: {}", e)));
        }
        drop(stdin);

        Ok(handle)
    }

    /// Block until every dispatched worker is done and return their results in
    /// worker order
    ///
    /// The first worker to fail stops the others; its error is returned.
    pub fn collect(&mut self) -> Result<Vec<BenchmarkResult>> {
        let mut killed = false;
        while !self.handles.iter().all(WorkerHandle::is_finished) {
            if self.ctx.stopping() && !killed {
                debug!("Stopping remaining workers");
                self.handles.iter_mut().for_each(WorkerHandle::kill);
                killed = true;
            }
            thread::sleep(WAIT_INTERVAL);
        }

        let ctx = self.ctx.clone();
        let outcomes: Vec<_> = self
            .handles
            .drain(..)
            .map(|mut h| (h.worker_id(), h.join(&ctx)))
            .collect();

        let failed = ctx.first_failure.get().copied();
        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for (worker_id, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) if failed == Some(worker_id) => return Err(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// Release the pool, stopping whatever is still running
    pub fn release(self) {}
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        warn!(workers = self.handles.len(), "Releasing pool with running workers");
        self.ctx.abort.store(true, Ordering::SeqCst);
        let ctx = self.ctx.clone();
        for mut handle in self.handles.drain(..) {
            handle.kill();
            let _ = handle.join(&ctx);
        }
    }
}

/// Body of a thread worker; errors and panics both count as the worker failing
fn run_thread_worker<F>(worker_id: usize, ctx: &WorkerContext, run: F) -> Result<BenchmarkResult>
where
    F: FnOnce() -> Result<BenchmarkResult>,
{
    ctx.metrics.update_worker_status(worker_id, WorkerStatus::Running);
    let outcome = panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        Err(ParallelError::WorkerFailed {
            worker: worker_id,
            message: format!("worker thread panicked: {}", panic_message(payload.as_ref())),
        })
    });

    match outcome {
        Ok(result) => {
            ctx.complete(worker_id, result.len());
            Ok(result)
        }
        Err(ParallelError::Core(CoreError::Cancelled)) => {
            ctx.metrics.update_worker_status(worker_id, WorkerStatus::Failed);
            Err(CoreError::Cancelled.into())
        }
        Err(e) => {
            ctx.fail(worker_id, &e.to_string());
            Err(match e {
                e @ ParallelError::WorkerFailed { .. } => e,
                e => ParallelError::WorkerFailed {
                    worker: worker_id,
                    message: e.to_string(),
                },
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Read frames from a worker process until its final message
fn read_worker_stream(worker_id: usize, stdout: ChildStdout, ctx: &WorkerContext) -> Result<Option<BenchmarkResult>> {
    let mut reader = BufReader::new(stdout);
    loop {
        let message = match read_frame::<_, WorkerMessage>(&mut reader) {
            Ok(Some(message)) => message,
            Ok(None) => {
                if !ctx.stopping() {
                    ctx.fail(worker_id, "exited without a result");
                }
                return Ok(None);
            }
            Err(e) => {
                if ctx.stopping() {
                    return Ok(None);
                }
                ctx.fail(worker_id, &e.to_string());
                return Err(e);
            }
        };

        match message {
            WorkerMessage::Started { configs, .. } => {
                ctx.metrics.update_worker_status(worker_id, WorkerStatus::Running);
                debug!(worker = worker_id, configs, "Worker process started");
            }
            WorkerMessage::ConfigFinished {
                steps,
                terminal,
                elapsed_us,
                ..
            } => {
                ctx.metrics
                    .record_config(worker_id, steps, terminal, Duration::from_micros(elapsed_us));
            }
            WorkerMessage::Finished { result, .. } => {
                ctx.complete(worker_id, result.len());
                return Ok(Some(result));
            }
            WorkerMessage::Failed { message, .. } => {
                ctx.fail(worker_id, &message);
                return Err(ParallelError::WorkerFailed {
                    worker: worker_id,
                    message,
                });
            }
        }
    }
}

/// Collect a worker's stderr, keeping the tail
fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut buf) {
        debug!(error = %e, "Failed to read worker stderr");
    }
    let start = buf.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&buf[start..]).into_owned()
}
