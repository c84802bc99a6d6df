//! Parallel benchmark run

use std::path::Path;

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use serde::Serialize;
use tracing::info;

use libroadbench_core::{load_suite_config, BehaviorSummary, BenchmarkDatabase};
use libroadbench_parallel::{MetricsSnapshot, ParallelBenchmarkRunner, WorkerBackend};

use crate::app::{self, App, RunOutcome};
use crate::cli::{Backend, RunArgs};
use crate::error::{CliError, Result};
use crate::ui::RunInfo;

/// JSON report written with `--json-report`
#[derive(Serialize)]
struct RunReport<'a> {
    run: &'a RunInfo,
    metrics: &'a MetricsSnapshot,
    behaviors: Vec<BehaviorSummary>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let suite = load_suite_config(&args.suite)?;
    let database = BenchmarkDatabase::load_dir(&args.database)?;
    if database.is_empty() {
        return Err(CliError::Config(format!(
            "no scenario sets found in {}",
            args.database.display()
        )));
    }

    let backend = match args.backend {
        Backend::Threads => WorkerBackend::Threads,
        Backend::Process => WorkerBackend::current_exe()?,
    };

    let runner = ParallelBenchmarkRunner::from_database(
        &database,
        suite.evaluators.clone(),
        suite.terminal_when.clone(),
        &suite.behaviors,
        suite.num_scenarios,
        args.workers.or(suite.workers),
    )?
    .with_settings(suite.settings)
    .with_backend(backend);

    let info = RunInfo {
        suite: suite_name(&args.suite),
        backend: runner.backend().as_str(),
        workers: runner.num_workers(),
        configs: runner.configs().len(),
        behaviors: suite.behaviors.len(),
    };
    info!(
        suite = %info.suite,
        configs = info.configs,
        workers = info.workers,
        backend = info.backend,
        "Starting benchmark"
    );

    let RunOutcome { result, snapshot } = if args.headless {
        app::run_headless(&runner, &info)?
    } else {
        App::new(runner, info.clone(), args.json_report.clone()).run()?
    };

    let behaviors = result.summary();
    println!();
    println!("{}", summary_table(&behaviors));

    if let Some(ref path) = args.result {
        result.dump(path)?;
        println!("Result saved to {}", path.display());
    }

    if let Some(ref path) = args.json_report {
        let report = RunReport {
            run: &info,
            metrics: &snapshot,
            behaviors,
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

fn suite_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One row per behavior with the mean of every evaluator
fn summary_table(behaviors: &[BehaviorSummary]) -> Table {
    let evaluators: Vec<&String> = behaviors
        .first()
        .map(|b| b.means.keys().collect())
        .unwrap_or_default();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    let mut header = vec![
        Cell::new("behavior"),
        Cell::new("configs"),
        Cell::new("mean steps"),
    ];
    header.extend(evaluators.iter().map(Cell::new));
    table.set_header(header);

    for behavior in behaviors {
        let mut row = vec![
            Cell::new(&behavior.behavior),
            Cell::new(behavior.configs),
            Cell::new(format!("{:.1}", behavior.mean_steps)),
        ];
        row.extend(evaluators.iter().map(|name| {
            Cell::new(
                behavior
                    .means
                    .get(*name)
                    .map(|mean| format!("{:.3}", mean))
                    .unwrap_or_else(|| "-".to_string()),
            )
        }));
        table.add_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_table_lists_behaviors() {
        let mut means = BTreeMap::new();
        means.insert("collision".to_string(), 0.25);
        means.insert("success".to_string(), 0.75);
        let behaviors = vec![BehaviorSummary {
            behavior: "constant_velocity".to_string(),
            configs: 4,
            mean_steps: 31.5,
            means,
        }];

        let rendered = summary_table(&behaviors).to_string();
        assert!(rendered.contains("constant_velocity"));
        assert!(rendered.contains("collision"));
        assert!(rendered.contains("0.750"));
        assert!(rendered.contains("31.5"));
    }

    #[test]
    fn test_suite_name_from_path() {
        assert_eq!(suite_name(Path::new("suites/standard.toml")), "standard");
    }
}
