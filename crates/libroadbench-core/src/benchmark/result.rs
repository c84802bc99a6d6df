//! Benchmark results

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config::BenchmarkConfig;
use crate::error::CoreError;
use crate::evaluation::EvalValue;
use crate::Result;

/// Outcome of one benchmark config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub config_idx: usize,
    pub scen_set: String,
    pub scen_idx: usize,
    pub behavior: String,
    /// Steps simulated before the episode ended
    pub step: u64,
    /// Terminal conditions that ended the episode
    pub terminal: Vec<String>,
    pub max_steps_reached: bool,
    /// Evaluator values at the final step
    pub evaluations: BTreeMap<String, EvalValue>,
}

/// Result rows plus the configs that produced them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    rows: Vec<ResultRow>,
    configs: Vec<BenchmarkConfig>,
}

/// Aggregate over all rows of one behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub behavior: String,
    pub configs: usize,
    pub mean_steps: f64,
    /// Mean evaluator values; booleans count as 0/1
    pub means: BTreeMap<String, f64>,
}

impl BenchmarkResult {
    pub fn new(rows: Vec<ResultRow>, configs: Vec<BenchmarkConfig>) -> Self {
        Self { rows, configs }
    }

    /// Concatenate partial results in iteration order
    pub fn merge<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = BenchmarkResult>,
    {
        let mut merged = Self::default();
        for part in parts {
            merged.extend(part);
        }
        merged
    }

    /// Append another result's rows and configs
    pub fn extend(&mut self, other: BenchmarkResult) {
        self.rows.extend(other.rows);
        self.configs.extend(other.configs);
    }

    pub fn result_rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn benchmark_configs(&self) -> &[BenchmarkConfig] {
        &self.configs
    }

    /// Number of result rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn config(&self, config_idx: usize) -> Option<&BenchmarkConfig> {
        self.configs.iter().find(|c| c.config_idx == config_idx)
    }

    pub fn row(&self, config_idx: usize) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.config_idx == config_idx)
    }

    /// Per-behavior means, in order of first appearance
    pub fn summary(&self) -> Vec<BehaviorSummary> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<&str, Vec<&ResultRow>> = BTreeMap::new();
        for row in &self.rows {
            if !groups.contains_key(row.behavior.as_str()) {
                order.push(row.behavior.clone());
            }
            groups.entry(row.behavior.as_str()).or_default().push(row);
        }

        order
            .into_iter()
            .map(|behavior| {
                let rows = groups.remove(behavior.as_str()).unwrap_or_default();
                let count = rows.len().max(1) as f64;

                let mut sums: BTreeMap<String, f64> = BTreeMap::new();
                for row in &rows {
                    for (name, value) in &row.evaluations {
                        *sums.entry(name.clone()).or_insert(0.0) += value.as_f64();
                    }
                }

                BehaviorSummary {
                    configs: rows.len(),
                    mean_steps: rows.iter().map(|r| r.step as f64).sum::<f64>() / count,
                    means: sums.into_iter().map(|(k, v)| (k, v / count)).collect(),
                    behavior,
                }
            })
            .collect()
    }

    /// Write the result as JSON
    pub fn dump(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Read a result written by [`BenchmarkResult::dump`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
