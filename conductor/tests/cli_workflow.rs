//! CLI tests for the task lifecycle and scheduling commands.
//!
//! Spawns the conductor binary against a temp project root and checks the JSON
//! result and exit code of each invocation.

use std::fs;
use std::path::Path;
use std::process::Command;

use conductor::exit_codes;
use conductor::io::paths::StatePaths;
use serde_json::Value;

struct Outcome {
    code: Option<i32>,
    json: Value,
}

fn conductor(root: &Path, args: &[&str]) -> Outcome {
    let output = Command::new(env!("CARGO_BIN_EXE_conductor"))
        .arg("--project")
        .arg(root)
        .args(args)
        .output()
        .expect("run conductor");
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let json = serde_json::from_str(stdout.trim()).expect("one JSON object on stdout");
    Outcome {
        code: output.status.code(),
        json,
    }
}

fn ok(root: &Path, args: &[&str]) -> Value {
    let out = conductor(root, args);
    assert_eq!(out.code, Some(exit_codes::OK), "{args:?}: {}", out.json);
    assert_eq!(out.json["success"], true);
    out.json
}

fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|task| task["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn readiness_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init", "--story-id", "STORY-1"]);
    ok(root, &["task-add", "--id", "1.1", "--name", "schema"]);
    ok(
        root,
        &["task-add", "--id", "1.2", "--name", "api", "--depends-on", "1.1"],
    );

    assert_eq!(ids(&ok(root, &["ready-tasks"])["ready"]), vec!["1.1"]);
    ok(root, &["task-start", "--id", "1.1", "--agent", "builder"]);
    let done = ok(root, &["task-complete", "--id", "1.1", "--commit", "abc123"]);
    assert_eq!(done["task"]["status"], "complete");
    assert_eq!(done["summary"]["complete"], 1);
    assert_eq!(ids(&ok(root, &["ready-tasks"])["ready"]), vec!["1.2"]);

    let listed = ok(root, &["task-list", "--status", "complete"]);
    assert_eq!(ids(&listed["tasks"]), vec!["1.1"]);
}

#[test]
fn parallel_batch_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init"]);
    ok(root, &["task-add", "--id", "A", "--name", "a", "--files", "x"]);
    ok(root, &["task-add", "--id", "B", "--name", "b", "--files", "x"]);
    ok(root, &["task-add", "--id", "C", "--name", "c", "--files", "y"]);

    let batch = ok(root, &["ready-tasks", "--parallel"]);
    assert_eq!(ids(&batch["ready"]), vec!["A", "C"]);

    let waves = ok(root, &["parallel-batches"]);
    assert_eq!(waves["count"], 2);
    assert_eq!(ids(&waves["batches"][1]), vec!["B"]);
}

#[test]
fn retry_escalation_through_the_cli() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init"]);
    ok(root, &["task-add", "--id", "1.1", "--name", "flaky"]);
    ok(root, &["task-start", "--id", "1.1"]);
    ok(root, &["task-fail", "--id", "1.1", "--error", "tests failed"]);

    let expected = ["same", "alternate-worker", "specialist-worker", "blocked"];
    for (attempt, escalation) in (1..=4).zip(expected) {
        let out = ok(
            root,
            &[
                "retry-push",
                "--id",
                "1.1",
                "--error",
                "tests failed",
                "--attempt",
                &attempt.to_string(),
            ],
        );
        assert_eq!(out["entry"]["escalation"], escalation);
        assert_eq!(out["task_blocked"], attempt >= 3);
    }
    assert_eq!(ok(root, &["retry-list"])["count"], 4);

    let popped = ok(root, &["retry-pop"]);
    assert_eq!(popped["entry"]["attempt"], 1);
    assert_eq!(popped["remaining"], 3);
    assert_eq!(popped["task_reset"], false);
    let listed = ok(root, &["task-list", "--status", "blocked"]);
    assert_eq!(ids(&listed["tasks"]), vec!["1.1"]);

    for _ in 0..3 {
        ok(root, &["retry-pop"]);
    }
    let empty = ok(root, &["retry-pop"]);
    assert!(empty["entry"].is_null());
}

#[test]
fn failures_carry_kind_and_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();

    let out = conductor(root, &["status"]);
    assert_eq!(out.code, Some(exit_codes::NOT_FOUND));
    assert_eq!(out.json["success"], false);
    assert_eq!(out.json["kind"], "not_found");

    ok(root, &["init"]);
    let out = conductor(root, &["init"]);
    assert_eq!(out.code, Some(exit_codes::ALREADY_EXISTS));

    ok(root, &["task-add", "--id", "a", "--name", "a"]);
    let out = conductor(root, &["task-add", "--id", "a", "--name", "again"]);
    assert_eq!(out.code, Some(exit_codes::ALREADY_EXISTS));

    let out = conductor(root, &["task-start", "--id", "missing"]);
    assert_eq!(out.code, Some(exit_codes::REFERENCE));
    assert_eq!(out.json["kind"], "reference");

    ok(root, &["task-add", "--id", "b", "--name", "b", "--depends-on", "c"]);
    let out = conductor(
        root,
        &["task-add", "--id", "c", "--name", "c", "--depends-on", "b"],
    );
    assert_eq!(out.code, Some(exit_codes::CYCLE));

    ok(root, &["task-complete", "--id", "a"]);
    let out = conductor(root, &["task-fail", "--id", "a"]);
    assert_eq!(out.code, Some(exit_codes::INVALID_TRANSITION));

    let out = conductor(root, &["retry-push", "--id", "a", "--error", "x"]);
    assert_eq!(out.code, Some(exit_codes::FAILURE));
    assert_eq!(out.json["kind"], "usage");
}

#[test]
fn corrupt_state_is_distinct_from_missing_state() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init"]);
    let paths = StatePaths::new(root);
    fs::write(&paths.state_path, "{\"version\": \"2.0\", \"tasks\": [{\"id\"").expect("truncate");

    let out = conductor(root, &["task-list"]);
    assert_eq!(out.code, Some(exit_codes::CORRUPT));
    assert_eq!(out.json["kind"], "corrupt");

    let out = conductor(root, &["init"]);
    assert_eq!(out.code, Some(exit_codes::ALREADY_EXISTS));
    ok(root, &["init", "--force"]);
    assert_eq!(ok(root, &["task-list"])["count"], 0);
}

#[test]
fn invalid_config_fails_with_invalid_input_kind() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init"]);
    let paths = StatePaths::new(root);
    fs::write(&paths.config_path, "lock_timeout_ms = 0\n").expect("write config");

    let out = conductor(root, &["task-list"]);
    assert_eq!(out.code, Some(exit_codes::FAILURE));
    assert_eq!(out.json["success"], false);
    assert_eq!(out.json["kind"], "invalid_input");
    assert!(out.json["error"].as_str().expect("error").contains("lock_timeout_ms"));
}

#[test]
fn graph_queries_and_validation() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    ok(root, &["init", "--story-id", "wf"]);
    ok(root, &["task-add", "--id", "1", "--name", "one"]);
    ok(root, &["task-add", "--id", "2", "--name", "two", "--depends-on", "1"]);
    ok(root, &["task-add", "--id", "3", "--name", "three", "--depends-on", "2, 1"]);
    ok(root, &["task-add", "--id", "4", "--name", "four"]);

    let path = ok(root, &["critical-path"]);
    assert_eq!(path["length"], 3);
    assert_eq!(path["critical_path"], serde_json::json!(["1", "2", "3"]));

    let rendered = ok(root, &["visualize"]);
    let text = rendered["rendered"].as_str().expect("text");
    assert!(text.contains("Critical path (3 tasks):"));

    assert_eq!(ok(root, &["validate"])["valid"], true);

    ok(root, &["checkpoint", "--commit", "abc", "--task-id", "1", "--message", "m"]);
    ok(root, &["task-complete", "--id", "1"]);
    let progress = ok(root, &["progress"]);
    let bar = progress["progress"].as_str().expect("bar");
    assert!(bar.starts_with("wf [=====---------------] 1/4 (25%)"), "{bar}");
    assert!(bar.contains("last commit:"));

    let status = ok(root, &["status"]);
    assert_eq!(status["summary"]["pending"], 3);
    assert_eq!(status["workflow_id"], "wf");
}
