//! Application state and event handling

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::Terminal;

use libroadbench_core::BenchmarkResult;
use libroadbench_parallel::{MetricsCollector, MetricsSnapshot, ParallelBenchmarkRunner};

use crate::error::{CliError, Result};
use crate::ui::{self, RunInfo, UiState};

/// What a finished run leaves behind
pub struct RunOutcome {
    pub result: BenchmarkResult,
    pub snapshot: MetricsSnapshot,
}

type RunHandle = JoinHandle<libroadbench_parallel::Result<BenchmarkResult>>;

/// Start the runner on a background thread
fn spawn_run(
    runner: &ParallelBenchmarkRunner,
    metrics: &Arc<MetricsCollector>,
    stop: &Arc<AtomicBool>,
) -> Result<RunHandle> {
    let runner = runner.clone();
    let metrics = Arc::clone(metrics);
    let stop = Arc::clone(stop);
    let handle = thread::Builder::new()
        .name("roadbench-run".to_string())
        .spawn(move || runner.run_with(metrics, stop))?;
    Ok(handle)
}

fn join_run(handle: RunHandle) -> Result<BenchmarkResult> {
    handle
        .join()
        .map_err(|_| CliError::Config("benchmark thread panicked".to_string()))?
        .map_err(CliError::from)
}

/// Interactive dashboard
pub struct App {
    runner: ParallelBenchmarkRunner,
    info: RunInfo,
    metrics: Arc<MetricsCollector>,
    stop: Arc<AtomicBool>,
    handle: Option<RunHandle>,
    outcome: Option<Result<BenchmarkResult>>,
    report_path: Option<PathBuf>,
    ui_state: UiState,
    should_quit: bool,
}

impl App {
    pub fn new(runner: ParallelBenchmarkRunner, info: RunInfo, report_path: Option<PathBuf>) -> Self {
        let metrics = Arc::new(MetricsCollector::new(info.configs, info.workers));

        Self {
            runner,
            info,
            metrics,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
            outcome: None,
            report_path,
            ui_state: UiState::default(),
            should_quit: false,
        }
    }

    /// Run the TUI until the user quits
    pub fn run(&mut self) -> Result<RunOutcome> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let loop_result = self.start_benchmark().and_then(|_| self.event_loop(&mut terminal));

        // Restore the terminal before reporting anything
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        loop_result?;

        self.finish()
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let tick_rate = Duration::from_millis(100);
        let mut last_tick = Instant::now();
        let mut last_throughput_update = Instant::now();

        loop {
            let snapshot = self.metrics.snapshot();
            terminal.draw(|frame| {
                ui::draw(frame, &self.info, &snapshot, &self.ui_state);
            })?;

            let timeout = tick_rate.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key)?;
                }
            }

            // Update throughput samples every second
            if last_throughput_update.elapsed() >= Duration::from_secs(1) {
                self.metrics.update_throughput_sample();
                last_throughput_update = Instant::now();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
            }

            if self.should_quit {
                return Ok(());
            }

            if self.handle.as_ref().is_some_and(|h| h.is_finished()) {
                if let Some(handle) = self.handle.take() {
                    let outcome = join_run(handle);
                    if let Err(ref e) = outcome {
                        self.metrics.log_event(format!("Benchmark failed: {}", e));
                    }
                    self.outcome = Some(outcome);
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                self.restart_benchmark()?;
            }
            KeyCode::Char('s') => {
                self.save_report()?;
            }
            KeyCode::Up => {
                self.ui_state.scroll_workers(-1, self.info.workers);
            }
            KeyCode::Down => {
                self.ui_state.scroll_workers(1, self.info.workers);
            }
            _ => {}
        }
        Ok(())
    }

    fn start_benchmark(&mut self) -> Result<()> {
        self.outcome = None;
        self.handle = Some(spawn_run(&self.runner, &self.metrics, &self.stop)?);
        Ok(())
    }

    /// Stop the current run, if any, and wait for it
    fn stop_benchmark(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::SeqCst);
            self.metrics.log_event("Benchmark stopped".to_string());
            self.outcome = Some(join_run(handle));
        }
    }

    fn restart_benchmark(&mut self) -> Result<()> {
        self.stop_benchmark();

        self.metrics = Arc::new(MetricsCollector::new(self.info.configs, self.info.workers));
        self.stop = Arc::new(AtomicBool::new(false));
        self.ui_state = UiState::default();

        self.start_benchmark()
    }

    fn save_report(&self) -> Result<()> {
        let report = serde_json::to_string_pretty(&self.metrics.snapshot())?;
        let path = self
            .report_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("roadbench-report.json"));

        std::fs::write(&path, report)?;
        self.metrics.log_event(format!("Report saved to {}", path.display()));
        Ok(())
    }

    fn finish(&mut self) -> Result<RunOutcome> {
        self.stop_benchmark();
        let snapshot = self.metrics.snapshot();
        print_summary(&self.info, &snapshot);

        match self.outcome.take() {
            Some(Ok(result)) => Ok(RunOutcome { result, snapshot }),
            Some(Err(e)) => Err(e),
            None => Err(libroadbench_core::CoreError::Cancelled.into()),
        }
    }
}

/// Run the benchmark without a TUI, printing progress once a second
pub fn run_headless(runner: &ParallelBenchmarkRunner, info: &RunInfo) -> Result<RunOutcome> {
    let metrics = Arc::new(MetricsCollector::new(info.configs, info.workers));
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_run(runner, &metrics, &stop)?;

    println!(
        "Running benchmark: {} configs on {} workers ({})...",
        info.configs, info.workers, info.backend
    );

    let total = info.configs;
    let mut last_update = Instant::now();
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(100));

        if last_update.elapsed() >= Duration::from_secs(1) {
            metrics.update_throughput_sample();
            let snapshot = metrics.snapshot();
            print!(
                "\rProgress: {}/{} ({:.1}%) - {:.0} configs/sec",
                snapshot.configs_completed,
                total,
                snapshot.progress() * 100.0,
                snapshot.current_throughput
            );
            io::stdout().flush().ok();
            last_update = Instant::now();
        }
    }

    let result = join_run(handle);
    println!();

    let snapshot = metrics.snapshot();
    print_summary(info, &snapshot);
    Ok(RunOutcome {
        result: result?,
        snapshot,
    })
}

pub fn print_summary(info: &RunInfo, snapshot: &MetricsSnapshot) {
    println!("\n=== ROADBENCH RESULTS ===\n");
    println!("Suite:            {}", info.suite);
    println!("Workers:          {} ({})", info.workers, info.backend);
    println!("Behaviors:        {}", info.behaviors);
    println!();
    println!(
        "Configs:          {}/{}",
        snapshot.configs_completed, snapshot.total_configs
    );
    println!(
        "Terminal:         {} ({:.1}%)",
        snapshot.terminal_configs,
        snapshot.terminal_rate()
    );
    println!("Max steps:        {}", snapshot.max_step_configs);
    println!("Simulated steps:  {}", snapshot.total_steps);
    println!();
    println!("Latency (P50):    {:.2}ms", snapshot.latencies.p50_ms());
    println!("Latency (P95):    {:.2}ms", snapshot.latencies.p95_ms());
    println!("Latency (P99):    {:.2}ms", snapshot.latencies.p99_ms());
    println!("Latency (Max):    {:.2}ms", snapshot.latencies.max_ms());
    println!();
    println!("Throughput:       {:.1} configs/sec", snapshot.configs_per_second());
    println!("Elapsed Time:     {:.2}s", snapshot.elapsed.as_secs_f64());
}
