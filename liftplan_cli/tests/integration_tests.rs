//! Integration tests for the liftplan binary.
//!
//! These tests verify end-to-end behavior including:
//! - Offline (fallback) generation and plan files
//! - Replayed oracle responses and the retry loop
//! - Analysis, prompt, validate and catalog commands

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const VALID_PLAN: &str = r#"{
    "title": "Squat and Press",
    "description": "Heavy compounds first",
    "exercises": [
        {"id": "barbell_back_squat", "sets": 4, "reps": "5"},
        {"id": "barbell_bench_press", "sets": 4, "reps": "5"},
        {"id": "barbell_row", "sets": 3, "reps": "8"},
        {"id": "romanian_deadlift", "sets": 3, "reps": "8"},
        {"id": "plank", "sets": 3, "reps": "12"}
    ],
    "estimatedDuration": 45,
    "difficulty": "intermediate"
}"#;

/// Temp dir with a config that never finds an oracle credential or
/// any history outside the temp dir
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = format!(
            r#"
[data]
data_dir = '{}'

[oracle]
api_key_env = "LIFTPLAN_TEST_NO_SUCH_KEY"

[equipment]
available = ["barbell", "bench"]
"#,
            dir.path().join("data").display()
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn cli(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liftplan"));
        cmd.arg("--config").arg(self.path("config.toml"));
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is not JSON")
}

fn exercise_ids(plan: &Value) -> Vec<String> {
    plan["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect()
}

fn barbell_context(ws: &Workspace) -> PathBuf {
    ws.write(
        "context.json",
        r#"{"equipment": ["barbell", "bench"], "progress": [
            {"exercise_id": "barbell_back_squat", "personal_record": 140.0,
             "percentile_ranking": 60.0, "strength_tier": "intermediate"}
        ]}"#,
    )
}

fn replay_file(ws: &Workspace, replies: &[&str]) -> PathBuf {
    let json = serde_json::to_string(replies).unwrap();
    ws.write("replay.json", &json)
}

fn validate(ws: &Workspace, plan: &Path) -> Value {
    stdout_json(ws.cli().arg("validate").arg("--plan").arg(plan))
}

#[test]
fn test_cli_help() {
    Workspace::new()
        .cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strength workout plan generator"));
}

#[test]
fn test_offline_generation_prints_valid_plan() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);

    let plan = stdout_json(
        ws.cli()
            .arg("generate")
            .arg("--context")
            .arg(&context)
            .arg("--offline"),
    );

    let count = plan["exercises"].as_array().unwrap().len();
    assert!((4..=6).contains(&count), "got {} exercises", count);
    assert_eq!(plan["estimatedDuration"], (count * 10 + 15) as u64);
    assert_eq!(plan["exercises"][0]["sets"], 4);
    assert_eq!(plan["exercises"][0]["completed"], false);
}

#[test]
fn test_missing_credential_falls_back() {
    let ws = Workspace::new();

    ws.cli()
        .env_remove("LIFTPLAN_TEST_NO_SUCH_KEY")
        .arg("generate")
        .assert()
        .success()
        .stderr(predicate::str::contains("fallback, OracleUnavailable"))
        .stderr(predicate::str::contains("Validation: valid"));
}

#[test]
fn test_output_file_validates() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);
    let out = ws.path("plans/latest.json");

    ws.cli()
        .arg("generate")
        .arg("--context")
        .arg(&context)
        .arg("--offline")
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    assert!(out.exists());
    let result = validate(&ws, &out);
    assert_eq!(result["isValid"], true);
    assert!(result["score"].as_u64().unwrap() >= 60);
}

#[test]
fn test_replay_accepts_second_attempt() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);
    let replay = replay_file(&ws, &["not a plan", VALID_PLAN]);

    let report = stdout_json(
        ws.cli()
            .arg("generate")
            .arg("--context")
            .arg(&context)
            .arg("--replay")
            .arg(&replay)
            .arg("--report"),
    );

    assert_eq!(report["origin"]["source"], "oracle");
    assert_eq!(report["origin"]["attempts"], 2);
    assert_eq!(report["strategy"], "competition");
    assert_eq!(report["plan"]["title"], "Squat and Press");
    // Recomputed as 5 exercises x 12 minutes
    assert_eq!(report["plan"]["estimatedDuration"], 60);
    assert_eq!(report["validation"]["isValid"], true);
}

#[test]
fn test_replay_failures_exhaust_to_fallback() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);
    let replay = ws.write(
        "replay.json",
        r#"[{"failure": "HTTP 503"}, "{\"title\": \"x\"}", "```json\n{ broken\n```"]"#,
    );

    let report = stdout_json(
        ws.cli()
            .arg("generate")
            .arg("--context")
            .arg(&context)
            .arg("--replay")
            .arg(&replay)
            .arg("--report"),
    );

    assert_eq!(report["origin"]["source"], "fallback");
    assert_eq!(report["origin"]["reason"], "exhausted");
    assert_eq!(report["validation"]["isValid"], true);
}

#[test]
fn test_regenerate_differs_from_previous() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);
    let replay = replay_file(&ws, &[VALID_PLAN]);
    let first_path = ws.path("first.json");

    ws.cli()
        .arg("generate")
        .arg("--context")
        .arg(&context)
        .arg("--replay")
        .arg(&replay)
        .arg("--output")
        .arg(&first_path)
        .assert()
        .success();
    let first: Value = serde_json::from_str(&fs::read_to_string(&first_path).unwrap()).unwrap();

    // The oracle repeats itself, so every attempt is rejected
    let replay = replay_file(&ws, &[VALID_PLAN, VALID_PLAN, VALID_PLAN]);
    let second = stdout_json(
        ws.cli()
            .arg("generate")
            .arg("--context")
            .arg(&context)
            .arg("--replay")
            .arg(&replay)
            .arg("--previous")
            .arg(&first_path),
    );

    let mut a = exercise_ids(&first);
    let mut b = exercise_ids(&second);
    a.sort();
    b.sort();
    assert_ne!(a, b);
}

#[test]
fn test_analyze_with_history() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);
    let when = (chrono::Utc::now() - chrono::Duration::days(2)).to_rfc3339();
    ws.write(
        "history/sessions.csv",
        &format!(
            "session_id,performed_at,exercise_id,weight,reps\n\
             6f1c1e0e-8c55-4a8e-9a53-1d2f4b6a7c01,{when},barbell_back_squat,140,5\n"
        ),
    );

    let analysis = stdout_json(
        ws.cli()
            .arg("analyze")
            .arg("--context")
            .arg(&context)
            .arg("--history-dir")
            .arg(ws.path("history")),
    );
    assert_eq!(analysis["recentExerciseIds"][0], "barbell_back_squat");
    assert_eq!(analysis["focus"]["kind"], "autoFocus");
    assert_eq!(analysis["overallPercentile"], 60.0);

    let analysis = stdout_json(
        ws.cli()
            .arg("analyze")
            .arg("--context")
            .arg(&context)
            .arg("--split")
            .arg("legs"),
    );
    assert_eq!(analysis["focus"]["kind"], "splitWeaknesses");
    assert_eq!(analysis["focus"]["split"], "legs");
}

#[test]
fn test_prompt_contains_contract_and_request() {
    let ws = Workspace::new();
    let context = barbell_context(&ws);

    ws.cli()
        .arg("prompt")
        .arg("--context")
        .arg(&context)
        .arg("--split")
        .arg("push")
        .arg("--request")
        .arg("short on time today")
        .assert()
        .success()
        .stdout(predicate::str::contains("OUTPUT CONTRACT"))
        .stdout(predicate::str::contains("short on time today"))
        .stdout(predicate::str::contains("barbell_bench_press"));
}

#[test]
fn test_validate_reports_invalid_plan_without_failing() {
    let ws = Workspace::new();
    let plan = ws.write(
        "bad.json",
        r#"{"id": "0b7f4a38-62e6-4b8f-a0e4-3c9a0c4c2d11", "title": "Arms",
            "description": "", "exercises": [{"id": "barbell_curl", "sets": 3, "reps": "8-10"}],
            "estimatedDuration": 10, "difficulty": "beginner",
            "createdAt": "2024-05-01T10:00:00Z"}"#,
    );

    let result = validate(&ws, &plan);
    assert_eq!(result["isValid"], false);
    let issues = result["criticalIssues"].as_array().unwrap();
    assert!(issues.iter().any(|i| i.as_str().unwrap().contains("primary lift")));
    assert!(issues.iter().any(|i| i.as_str().unwrap().contains("single integer")));
}

#[test]
fn test_catalog_filters() {
    let ws = Workspace::new();

    ws.cli()
        .arg("catalog")
        .arg("--percentile")
        .arg("0")
        .arg("--equipment")
        .arg("barbell,bench")
        .assert()
        .success()
        .stdout(predicate::str::contains("barbell_back_squat"))
        .stdout(predicate::str::contains("barbell_bench_press"))
        .stdout(predicate::str::contains("front_squat").not())
        .stdout(predicate::str::contains("kettlebell_swing").not());
}

#[test]
fn test_unknown_split_is_rejected() {
    let ws = Workspace::new();

    ws.cli()
        .arg("generate")
        .arg("--offline")
        .arg("--split")
        .arg("arms")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown split"));
}
