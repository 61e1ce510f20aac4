//! Scheduler specs: `passed` gating, skip-on-failure, cycle rejection.

use crate::prelude::*;
use serde_json::json;

fn gated(passed: &[&str]) -> serde_json::Value {
    json!({"get": "repo", "passed": passed})
}

fn repo_resource() -> serde_json::Value {
    json!({"repo": {"type": "mock", "source": {"versions": ["1"]}}})
}

#[tokio::test]
async fn diamond_graph_runs_in_dependency_order() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [
                {"name": "fan-in", "plan": [gated(&["left", "right"]), sh_task("t", "true")]},
                {"name": "root", "plan": [sh_task("t", "true")]},
                {"name": "left", "plan": [gated(&["root"]), sh_task("t", "true")]},
                {"name": "right", "plan": [gated(&["root"]), sh_task("t", "true")]}
            ],
            "resources": repo_resource(),
            "assert": {"execution": ["root", "left", "right", "fan-in"]}
        }))
        .await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());
}

#[tokio::test]
async fn dependent_of_a_failed_job_is_skipped() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [
                {"name": "root", "plan": [sh_task("failing-task", "exit 1")]},
                {"name": "downstream", "plan": [gated(&["root"]), sh_task("t", "true")]}
            ],
            "resources": repo_resource()
        }))
        .await;

    assert!(outcome
        .err_string()
        .contains("failing-task failed with code 1"));
    assert_eq!(outcome.jobs_run, vec!["root"]);
    assert!(world
        .statuses("/pipeline/run-1/jobs/downstream")
        .await
        .is_empty());
}

#[tokio::test]
async fn cyclic_passed_graph_is_rejected_before_execution() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [
                {"name": "a", "plan": [gated(&["b"]), sh_task("t", "true")]},
                {"name": "b", "plan": [gated(&["a"]), sh_task("t", "true")]}
            ],
            "resources": repo_resource()
        }))
        .await;

    assert!(outcome.err_string().contains("cycle"));
    assert!(outcome.jobs_run.is_empty());
    assert!(world.statuses("/pipeline").await.is_empty());
}

#[tokio::test]
async fn validation_failures_surface_before_any_job_runs() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [{"name": "a", "plan": [{"get": "unknown-resource"}]}]
        }))
        .await;
    assert!(outcome.err_string().contains("unknown resource"));
    assert!(outcome.jobs_run.is_empty());
}

#[tokio::test]
async fn job_depends_on_is_written_for_observability() {
    let world = World::new();
    let outcome = world
        .run(json!({
            "jobs": [
                {"name": "root", "plan": [sh_task("t", "true")]},
                {"name": "child", "plan": [gated(&["root"]), sh_task("t", "true")]}
            ],
            "resources": repo_resource()
        }))
        .await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());

    let records = world
        .records("/pipeline/run-1/jobs/child", &["status", "dependsOn"])
        .await;
    let job_record = records
        .iter()
        .find(|record| record.path == "/pipeline/run-1/jobs/child")
        .unwrap();
    assert_eq!(job_record.fields["dependsOn"], json!(["root"]));
}
