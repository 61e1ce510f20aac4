//! Mutated-assertion specs: rewriting any expectation to a value that does
//! not match must fail with a message containing `assertion failed`.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn unknown_job_in_pipeline_execution_assert_fails() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [{"name": "only", "plan": [sh_task("t", "true")]}],
            "assert": {"execution": ["only", "unknown-job"]}
        }))
        .await;
    assert!(outcome.err_string().contains("assertion failed"));
}

#[tokio::test]
async fn unknown_task_in_job_execution_assert_fails() {
    let world = World::new();
    let outcome = world
        .run(one_job(json!({
            "name": "job",
            "plan": [sh_task("t", "true")],
            "assert": {"execution": ["t", "unknown-task"]}
        })))
        .await;
    assert!(outcome.err_string().contains("assertion failed"));
}

#[tokio::test]
async fn mutated_stdout_expectation_fails() {
    let world = World::new();
    let mut task = sh_task("t", "echo actual-output");
    task["assert"] = json!({"stdout": "mutated-expectation"});
    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [task]})))
        .await;
    assert!(outcome.err_string().contains("assertion failed"));
}

#[tokio::test]
async fn mutated_stderr_expectation_fails() {
    let world = World::new();
    let mut task = sh_task("t", "echo actual-diagnostic >&2");
    task["assert"] = json!({"stderr": "mutated-diagnostic"});
    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [task]})))
        .await;
    assert!(outcome.err_string().contains("assertion failed"));
}

#[tokio::test]
async fn mutated_code_expectation_fails() {
    let world = World::new();
    let mut task = sh_task("t", "true");
    task["assert"] = json!({"code": 7});
    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [task]})))
        .await;
    assert!(outcome.err_string().contains("assertion failed"));
}

#[tokio::test]
async fn matching_expectations_pass_and_are_counted() {
    let world = World::new();
    let mut task = sh_task("t", "echo out; echo err >&2");
    task["assert"] = json!({"stdout": "out", "stderr": "err", "code": 0});
    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [task]})))
        .await;
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.asserts, 3);
}

#[tokio::test]
async fn assertion_failure_marks_the_step_failed_in_the_store() {
    let world = World::new();
    let mut task = sh_task("t", "echo real");
    task["assert"] = json!({"stdout": "imaginary"});
    let _ = world
        .run(one_job(json!({"name": "job", "plan": [task]})))
        .await;

    let statuses = world.statuses("/pipeline/run-1/jobs/job/00/tasks/t").await;
    assert_eq!(statuses.first().map(|(_, s)| s.as_str()), Some("failure"));
}
