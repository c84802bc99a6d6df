//! End-to-end tests for the roadbench binary

use std::path::Path;

use assert_cmd::Command;
use libroadbench_core::{BenchmarkResult, ParameterServer};
use predicates::prelude::*;
use tempfile::tempdir;

const SUITE: &str = r#"
num_scenarios = 2

[settings]
max_steps = 60
step_time = 0.2

[evaluators]
success = "goal_reached"
collision = "collision"
drivable_area = "drivable_area"
step = "step_count"

[terminal_when]
collision = { op = "is_true" }
success = { op = "is_true" }
drivable_area = { op = "is_false" }

[[behaviors]]
name = "constant_velocity"
model = { type = "constant_velocity" }

[[behaviors]]
name = "stop"
model = { type = "stationary" }
"#;

fn roadbench() -> Command {
    let mut cmd = Command::cargo_bin("roadbench").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Scenario database with two generated sets of three scenarios each
fn setup_database(root: &Path) {
    let db = root.join("db");
    std::fs::create_dir_all(&db).unwrap();
    for name in ["merge_a", "merge_b"] {
        roadbench()
            .args(["generate", "--num-scenarios", "3", "--name", name, "--out"])
            .arg(db.join(format!("{}.json", name)))
            .assert()
            .success();
    }
    std::fs::write(root.join("suite.toml"), SUITE).unwrap();
}

#[test]
fn test_generate_writes_scenario_set() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("sets").join("highway.json");

    roadbench()
        .args(["generate", "-n", "4", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 scenarios of set 'highway_merge'"));

    let set = libroadbench_core::ScenarioSet::load(&out).unwrap();
    assert_eq!(set.scenarios.len(), 4);
}

#[test]
fn test_run_headless_threads() {
    let temp = tempdir().unwrap();
    setup_database(temp.path());
    let result_path = temp.path().join("result.json");
    let report_path = temp.path().join("report.json");

    roadbench()
        .args(["run", "--headless", "--backend", "threads", "-w", "2", "--suite"])
        .arg(temp.path().join("suite.toml"))
        .arg("--database")
        .arg(temp.path().join("db"))
        .arg("--result")
        .arg(&result_path)
        .arg("--json-report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ROADBENCH RESULTS"))
        .stdout(predicate::str::contains("constant_velocity"));

    // 2 sets x 2 scenarios x 2 behaviors
    let result = BenchmarkResult::load(&result_path).unwrap();
    assert_eq!(result.len(), 8);
    let mut indices: Vec<usize> = result.result_rows().iter().map(|r| r.config_idx).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["metrics"]["configs_completed"], 8);
    assert_eq!(report["behaviors"].as_array().unwrap().len(), 2);
}

#[test]
fn test_run_headless_process_backend() {
    let temp = tempdir().unwrap();
    setup_database(temp.path());
    let result_path = temp.path().join("result.json");

    roadbench()
        .args(["run", "--headless", "--backend", "process", "-w", "2", "--suite"])
        .arg(temp.path().join("suite.toml"))
        .arg("--database")
        .arg(temp.path().join("db"))
        .arg("--result")
        .arg(&result_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Result saved"));

    let result = BenchmarkResult::load(&result_path).unwrap();
    assert_eq!(result.len(), 8);
    assert_eq!(result.benchmark_configs().len(), 8);
    for row in result.result_rows() {
        assert_eq!(result.config(row.config_idx).unwrap().behavior_name(), row.behavior);
    }
}

#[test]
fn test_run_rejects_bad_suite() {
    let temp = tempdir().unwrap();
    setup_database(temp.path());
    std::fs::write(temp.path().join("bad.toml"), "[[behaviors]]\nname = 3\n").unwrap();

    roadbench()
        .args(["run", "--headless", "--suite"])
        .arg(temp.path().join("bad.toml"))
        .arg("--database")
        .arg(temp.path().join("db"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_scenario_steps_and_draws() {
    let temp = tempdir().unwrap();
    let params_path = temp.path().join("params.json");
    let saved_path = temp.path().join("saved.json");
    std::fs::write(&params_path, r#"{ "simulation": { "step_time": 0.2 } }"#).unwrap();

    roadbench()
        .args(["scenario", "--no-pacing", "--steps", "2", "--params"])
        .arg(&params_path)
        .arg("--save-params")
        .arg(&saved_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("t = 0.00s"))
        .stdout(predicate::str::contains("t = 0.40s"))
        .stdout(predicate::str::contains("E"));

    let saved = ParameterServer::load(&saved_path).unwrap();
    assert!(saved.contains("simulation::real_time_factor"));
    assert!(saved.contains("viewer::columns"));
    assert!(saved.contains("scenario::generation::configurable::seed"));
}

#[test]
fn test_scenario_missing_params() {
    let temp = tempdir().unwrap();

    roadbench()
        .args(["scenario", "--params"])
        .arg(temp.path().join("missing.json"))
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_scenario_unrepresentable_pacing_rejected() {
    let temp = tempdir().unwrap();
    let params_path = temp.path().join("params.json");
    std::fs::write(
        &params_path,
        r#"{ "simulation": { "step_time": 0.2, "real_time_factor": 1e-300 } }"#,
    )
    .unwrap();

    roadbench()
        .args(["scenario", "--steps", "1", "--params"])
        .arg(&params_path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("real_time_factor"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_worker_without_job_fails() {
    roadbench()
        .arg("worker")
        .write_stdin(Vec::<u8>::new())
        .assert()
        .failure()
        .code(6);
}
