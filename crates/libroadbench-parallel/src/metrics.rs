//! Thread-safe metrics for a parallel benchmark run

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Thread-safe metrics collector shared by the pool, its workers and the UI
pub struct MetricsCollector {
    pub configs_completed: AtomicU64,
    pub terminal_configs: AtomicU64,
    pub max_step_configs: AtomicU64,
    pub total_steps: AtomicU64,
    total_configs: AtomicUsize,

    // Per-config wall time, 1us to 60s
    latency_histogram: RwLock<Option<Histogram<u64>>>,

    worker_metrics: RwLock<Vec<WorkerMetrics>>,
    throughput_history: RwLock<ThroughputHistory>,
    event_log: RwLock<EventLog>,

    run_id: Uuid,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new(total_configs: usize, worker_count: usize) -> Self {
        let worker_metrics = (0..worker_count)
            .map(|worker_id| WorkerMetrics {
                worker_id,
                ..WorkerMetrics::default()
            })
            .collect();

        Self {
            configs_completed: AtomicU64::new(0),
            terminal_configs: AtomicU64::new(0),
            max_step_configs: AtomicU64::new(0),
            total_steps: AtomicU64::new(0),
            total_configs: AtomicUsize::new(total_configs),

            latency_histogram: RwLock::new(Histogram::new_with_bounds(1, 60_000_000, 3).ok()),

            worker_metrics: RwLock::new(worker_metrics),
            throughput_history: RwLock::new(ThroughputHistory::new(60)),
            event_log: RwLock::new(EventLog::new(100)),

            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    /// Record one finished config
    pub fn record_config(&self, worker_id: usize, steps: u64, terminal: bool, latency: Duration) {
        self.configs_completed.fetch_add(1, Ordering::Relaxed);
        self.total_steps.fetch_add(steps, Ordering::Relaxed);
        if terminal {
            self.terminal_configs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.max_step_configs.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut hist) = self.latency_histogram.write() {
            if let Some(hist) = hist.as_mut() {
                hist.saturating_record((latency.as_micros() as u64).max(1));
            }
        }

        if let Ok(mut workers) = self.worker_metrics.write() {
            if let Some(worker) = workers.get_mut(worker_id) {
                worker.completed += 1;
                if terminal {
                    worker.terminal += 1;
                } else {
                    worker.max_steps += 1;
                }
            }
        }
    }

    /// Update worker status
    pub fn update_worker_status(&self, worker_id: usize, status: WorkerStatus) {
        if let Ok(mut workers) = self.worker_metrics.write() {
            if let Some(worker) = workers.get_mut(worker_id) {
                worker.status = status;
            }
        }
    }

    /// Set the number of configs dealt to a worker
    pub fn set_worker_shard(&self, worker_id: usize, shard_size: usize) {
        if let Ok(mut workers) = self.worker_metrics.write() {
            if worker_id >= workers.len() {
                let start = workers.len();
                workers.extend((start..=worker_id).map(|worker_id| WorkerMetrics {
                    worker_id,
                    ..WorkerMetrics::default()
                }));
            }
            workers[worker_id].shard_size = shard_size;
        }
    }

    /// Total configs expected in this run
    pub fn total_configs(&self) -> usize {
        self.total_configs.load(Ordering::Relaxed)
    }

    pub fn set_total_configs(&self, total: usize) {
        self.total_configs.store(total, Ordering::Relaxed);
    }

    /// Add an event to the log
    pub fn log_event(&self, message: String) {
        tracing::debug!(run_id = %self.run_id, "{}", message);
        if let Ok(mut log) = self.event_log.write() {
            log.add(format!("{} {}", Utc::now().format("%H:%M:%S"), message));
        }
    }

    /// Update throughput sample (call once per second)
    pub fn update_throughput_sample(&self) {
        let current = self.configs_completed.load(Ordering::Relaxed);
        if let Ok(mut history) = self.throughput_history.write() {
            history.add_sample(current);
        }
    }

    /// Get latency percentiles
    pub fn get_latency_percentiles(&self) -> LatencyPercentiles {
        match self.latency_histogram.read() {
            Ok(hist) => match hist.as_ref() {
                Some(hist) if !hist.is_empty() => LatencyPercentiles {
                    p50_us: hist.value_at_percentile(50.0),
                    p95_us: hist.value_at_percentile(95.0),
                    p99_us: hist.value_at_percentile(99.0),
                    max_us: hist.max(),
                },
                _ => LatencyPercentiles::default(),
            },
            Err(_) => LatencyPercentiles::default(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (throughput_history, current_throughput, peak_throughput) = self
            .throughput_history
            .read()
            .map(|h| (h.samples.iter().copied().collect(), h.current_rate(), h.peak_rate()))
            .unwrap_or_default();

        MetricsSnapshot {
            run_id: self.run_id.to_string(),
            started_at: self.started_at,
            total_configs: self.total_configs() as u64,
            configs_completed: self.configs_completed.load(Ordering::Relaxed),
            terminal_configs: self.terminal_configs.load(Ordering::Relaxed),
            max_step_configs: self.max_step_configs.load(Ordering::Relaxed),
            total_steps: self.total_steps.load(Ordering::Relaxed),

            latencies: self.get_latency_percentiles(),
            throughput_history,
            current_throughput,
            peak_throughput,

            worker_metrics: self.worker_metrics.read().map(|m| m.clone()).unwrap_or_default(),
            event_log: self.event_log.read().map(|l| l.recent()).unwrap_or_default(),

            elapsed: self.elapsed(),
        }
    }
}

/// Per-worker metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub worker_id: usize,
    pub status: WorkerStatus,
    pub shard_size: usize,
    pub completed: u64,
    pub terminal: u64,
    pub max_steps: u64,
}

/// Worker status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerStatus {
    #[default]
    Pending,
    Running,
    Complete,
    Failed,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Pending => "Pending",
            WorkerStatus::Running => "Running",
            WorkerStatus::Complete => "Complete",
            WorkerStatus::Failed => "Failed",
        }
    }
}

/// Latency percentiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyPercentiles {
    pub fn p50_ms(&self) -> f64 {
        self.p50_us as f64 / 1000.0
    }

    pub fn p95_ms(&self) -> f64 {
        self.p95_us as f64 / 1000.0
    }

    pub fn p99_ms(&self) -> f64 {
        self.p99_us as f64 / 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max_us as f64 / 1000.0
    }
}

/// Throughput history for sparkline
pub struct ThroughputHistory {
    samples: VecDeque<u64>,
    max_samples: usize,
    last_count: u64,
}

impl ThroughputHistory {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            last_count: 0,
        }
    }

    pub fn add_sample(&mut self, current_count: u64) {
        let rate = current_count.saturating_sub(self.last_count);
        self.last_count = current_count;

        self.samples.push_back(rate);
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn current_rate(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0) as f64
    }

    pub fn peak_rate(&self) -> f64 {
        self.samples.iter().copied().max().unwrap_or(0) as f64
    }
}

/// Event log (circular buffer)
pub struct EventLog {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl EventLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    pub fn add(&mut self, entry: String) {
        self.entries.push_back(entry);
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn recent(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// Snapshot of all metrics for rendering and the JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total_configs: u64,
    pub configs_completed: u64,
    pub terminal_configs: u64,
    pub max_step_configs: u64,
    pub total_steps: u64,

    pub latencies: LatencyPercentiles,
    pub throughput_history: Vec<u64>,
    pub current_throughput: f64,
    pub peak_throughput: f64,

    pub worker_metrics: Vec<WorkerMetrics>,
    pub event_log: Vec<String>,

    #[serde(with = "serde_duration")]
    pub elapsed: Duration,
}

mod serde_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

impl MetricsSnapshot {
    /// Fraction of configs finished, 0..=1
    pub fn progress(&self) -> f64 {
        if self.total_configs == 0 {
            1.0
        } else {
            (self.configs_completed as f64 / self.total_configs as f64).min(1.0)
        }
    }

    /// Percentage of finished configs that ended on a terminal condition
    pub fn terminal_rate(&self) -> f64 {
        if self.configs_completed == 0 {
            0.0
        } else {
            (self.terminal_configs as f64 / self.configs_completed as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.configs_completed >= self.total_configs
    }

    pub fn configs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.configs_completed as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_config_updates_worker() {
        let metrics = MetricsCollector::new(3, 2);
        metrics.set_worker_shard(1, 3);
        metrics.record_config(1, 12, true, Duration::from_millis(2));
        metrics.record_config(1, 50, false, Duration::from_millis(4));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.configs_completed, 2);
        assert_eq!(snapshot.terminal_configs, 1);
        assert_eq!(snapshot.max_step_configs, 1);
        assert_eq!(snapshot.total_steps, 62);
        assert!(!snapshot.is_complete());

        let worker = &snapshot.worker_metrics[1];
        assert_eq!(worker.shard_size, 3);
        assert_eq!(worker.completed, 2);
        assert_eq!(worker.terminal, 1);
        assert_eq!(worker.max_steps, 1);
        assert!(snapshot.latencies.max_us >= 4000);
    }

    #[test]
    fn test_unknown_worker_ignored() {
        let metrics = MetricsCollector::new(1, 1);
        metrics.update_worker_status(5, WorkerStatus::Running);
        metrics.record_config(5, 1, true, Duration::from_micros(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.worker_metrics.len(), 1);
        assert_eq!(snapshot.configs_completed, 1);
        assert!(snapshot.is_complete());
    }

    #[test]
    fn test_empty_run_progress() {
        let snapshot = MetricsCollector::new(0, 1).snapshot();
        assert_eq!(snapshot.progress(), 1.0);
        assert_eq!(snapshot.terminal_rate(), 0.0);
        assert_eq!(snapshot.latencies.p50_us, 0);
    }

    #[test]
    fn test_throughput_history() {
        let mut history = ThroughputHistory::new(2);
        history.add_sample(5);
        history.add_sample(12);
        history.add_sample(13);
        assert_eq!(history.current_rate(), 1.0);
        assert_eq!(history.peak_rate(), 7.0);
    }

    #[test]
    fn test_event_log_bounded() {
        let metrics = MetricsCollector::new(0, 0);
        for i in 0..150 {
            metrics.log_event(format!("event {}", i));
        }
        let log = metrics.snapshot().event_log;
        assert_eq!(log.len(), 100);
        assert!(log[99].ends_with("event 149"));
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = MetricsCollector::new(2, 1);
        metrics.record_config(0, 3, true, Duration::from_micros(250));
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.configs_completed, 1);
        assert_eq!(back.run_id, metrics.run_id().to_string());
    }
}
