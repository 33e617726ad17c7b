//! End-to-end tests for the command line
//!
//! These run the built binary against temporary configs and trace
//! directories; no network or external services are needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_escoffier-eval"))
}

fn run(args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .output()
        .expect("Failed to run escoffier-eval")
}

/// The only JSON result written to `dir`
fn read_result(dir: &Path) -> serde_json::Value {
    let path = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .expect("no JSON result written");
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

const TRACE: &str = r#"{
  "agents": [
    {
      "id": "cook-1",
      "role": "line_cook",
      "station": "grill",
      "memory": {
        "short_term": [
          {"timestamp": "2024-06-01T18:00:00Z", "type": "resource_start", "content": "Grill on", "metadata": {"resource": "grill"}},
          {"timestamp": "2024-06-01T18:20:00Z", "type": "communication", "content": "Two minutes on 7"},
          {"timestamp": "2024-06-01T18:40:00Z", "type": "resource_stop", "content": "Grill off", "metadata": {"resource": "grill"}}
        ],
        "task_queue": [
          {"id": "t1", "type": "sear", "status": "completed"},
          {"id": "t2", "type": "plate", "status": "in_progress"}
        ]
      }
    }
  ],
  "orders": [
    {"id": "o1", "type": "main_course", "complexity": 2,
     "received_at": "2024-06-01T18:00:00Z", "completed_at": "2024-06-01T18:15:00Z"}
  ]
}"#;

#[test]
fn test_models_and_scenarios_listing() {
    let output = run(&["models"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gpt4"));
    assert!(stdout.contains("mixtral"));

    let output = run(&["scenarios"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("quality_control"));
}

#[test]
fn test_synthetic_evaluation_writes_results() {
    let out = TempDir::new().unwrap();

    let output = run(&[
        "evaluate",
        "--model",
        "gpt4",
        "--scenario",
        "busy_night",
        "--output",
        out.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result = read_result(out.path());
    assert_eq!(result["model"], "gpt4");
    assert_eq!(result["mode"], "synthetic");
    assert_eq!(result["events"].as_array().unwrap().len(), 5);

    let reports = fs::read_dir(out.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().to_string_lossy().ends_with("_report.md"))
        .count();
    assert_eq!(reports, 1);
}

#[test]
fn test_trace_evaluation_from_config() {
    let work = TempDir::new().unwrap();
    let traces = work.path().join("traces");
    fs::create_dir_all(traces.join("claude3")).unwrap();
    fs::write(traces.join("claude3").join("high_labor.json"), TRACE).unwrap();

    let config = work.path().join("playground.yaml");
    fs::write(
        &config,
        format!("evaluation:\n  mode: trace\n  traces_dir: {}\n", traces.display()),
    )
    .unwrap();

    let out = work.path().join("out");
    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "evaluate",
        "--model",
        "claude3",
        "--scenario",
        "high_labor",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result = read_result(&out);
    assert_eq!(result["mode"], "trace");
    assert_eq!(result["metrics"]["agents_evaluated"], 1.0);
    assert_eq!(result["metrics"]["orders_completed"], 1.0);
    // 1 of 2 tasks completed, weighted 0.4
    let completion = result["metrics"]["task_completion"].as_f64().unwrap();
    assert!((completion - 0.2).abs() < 1e-9);

    let prom = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.to_string_lossy().ends_with("_metrics.prom"))
        .expect("no metrics snapshot written");
    let text = fs::read_to_string(prom).unwrap();
    assert!(text.contains(r#"resource_utilization_percent{role="line_cook",station="grill"} 100"#));
}

#[test]
fn test_missing_trace_fails() {
    let work = TempDir::new().unwrap();
    let config = work.path().join("playground.yaml");
    fs::write(
        &config,
        format!("evaluation:\n  traces_dir: {}\n", work.path().join("none").display()),
    )
    .unwrap();

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "evaluate",
        "--model",
        "gpt4",
        "--scenario",
        "busy_night",
        "--trace",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no run trace"));
}

#[test]
fn test_unknown_model_fails() {
    let output = run(&["evaluate", "--model", "gpt5", "--scenario", "busy_night"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid model: gpt5"));
}

#[test]
fn test_init_writes_loadable_config() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("generated.yaml");

    let output = run(&["init", "--output", path.to_str().unwrap()]);
    assert!(output.status.success());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("outbound_capacity: 256"));
    assert!(content.contains("seed: 42"));
}
