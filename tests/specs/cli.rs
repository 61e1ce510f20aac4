//! Black-box CLI specs: invoke the `gantry` binary and verify stdout,
//! stderr, and exit codes.

use crate::prelude::*;
use serde_json::json;
use std::path::Path;

fn write_pipeline(dir: &Path, name: &str, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

fn passing_pipeline() -> serde_json::Value {
    json!({
        "name": "greenline",
        "jobs": [{"name": "only", "plan": [sh_task("hello", "echo hello")]}]
    })
}

fn failing_pipeline() -> serde_json::Value {
    json!({
        "jobs": [{"name": "only", "plan": [sh_task("failing-task", "exit 1")]}]
    })
}

#[test]
fn run_succeeds_for_a_green_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = write_pipeline(dir.path(), "green.json", passing_pipeline());

    gantry()
        .arg("--store")
        .arg(dir.path().join("state"))
        .arg("run")
        .arg(&pipeline)
        .passes()
        .stdout_has("succeeded");
}

#[test]
fn run_fails_with_the_responsible_task_named() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = write_pipeline(dir.path(), "red.json", failing_pipeline());

    gantry()
        .arg("--store")
        .arg(dir.path().join("state"))
        .arg("run")
        .arg(&pipeline)
        .fails()
        .stderr_has("failing-task failed with code 1");
}

#[test]
fn run_rejects_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    gantry()
        .arg("--store")
        .arg(dir.path().join("state"))
        .arg("run")
        .arg(dir.path().join("absent.json"))
        .fails()
        .stderr_has("not found");
}

#[test]
fn set_is_idempotent_over_the_pipeline_list() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = write_pipeline(dir.path(), "green.json", passing_pipeline());
    let store = dir.path().join("state");

    for _ in 0..2 {
        gantry()
            .arg("--store")
            .arg(&store)
            .arg("set")
            .arg(&pipeline)
            .passes()
            .stdout_has("greenline set");
    }

    let listing = gantry()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .passes()
        .stdout;
    assert_eq!(
        listing.matches("greenline").count(),
        1,
        "set must register each pipeline once: {listing}"
    );
}

#[test]
fn list_with_no_pipelines_says_so() {
    let dir = tempfile::tempdir().unwrap();
    gantry()
        .arg("--store")
        .arg(dir.path().join("state"))
        .arg("list")
        .passes()
        .stdout_has("no pipelines set");
}

#[test]
fn set_rejects_an_invalid_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = write_pipeline(dir.path(), "bad.json", json!({"jobs": []}));
    gantry()
        .arg("--store")
        .arg(dir.path().join("state"))
        .arg("set")
        .arg(&pipeline)
        .fails()
        .stderr_has("at least one job");
}

#[test]
fn resource_state_survives_separate_runs_through_the_journal() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state");

    // Same pipeline file (same pipeline ID), growing upstream versions.
    for versions in [json!(["v1"]), json!(["v1", "v2"])] {
        let pipeline = write_pipeline(
            dir.path(),
            "every.json",
            json!({
                "jobs": [{"name": "consume", "plan": [{"get": "repo", "version": "every"}]}],
                "resources": {"repo": {"type": "mock", "source": {"versions": versions}}}
            }),
        );
        gantry()
            .arg("--store")
            .arg(&store)
            .arg("run")
            .arg(&pipeline)
            .passes();
    }

    // Two runs, two distinct versions in the journal.
    let journal = std::fs::read_to_string(store.join("journal.jsonl")).unwrap();
    let appended = journal
        .lines()
        .filter(|line| line.contains("resource_version"))
        .count();
    assert_eq!(appended, 2, "journal: {journal}");
}
