//! Hook lifecycle specs mirroring the classic fixture set: each spec is one
//! normalized pipeline driven end to end.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn on_failure_fixture_reports_the_failing_task() {
    let world = World::new();
    let mut failing = sh_task("failing-task", "exit 1");
    failing["on_failure"] = sh_task("on-failure-task", "true");

    let outcome = world
        .run(one_job(json!({"name": "failing-job", "plan": [failing]})))
        .await;

    assert!(outcome
        .err_string()
        .contains("failing-task failed with code 1"));

    // The hook ran and recorded its own success.
    let statuses = world.statuses("/pipeline/run-1/jobs/failing-job").await;
    let hook = statuses.iter().find(|(path, _)| {
        path.ends_with("tasks/failing-task/on_failure/tasks/on-failure-task")
    });
    assert_eq!(hook.map(|(_, status)| status.as_str()), Some("success"));
}

#[tokio::test]
async fn ensure_fixture_reports_the_ensure_failure_without_overriding_on_failure() {
    let world = World::new();
    let mut failing = sh_task("failing-task", "exit 1");
    failing["on_failure"] = sh_task("on-failure-task", "true");
    failing["ensure"] = sh_task("ensure-task", "exit 1");

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [failing]})))
        .await;

    assert!(outcome
        .err_string()
        .contains("ensure-task failed with code 1"));

    // on_failure still fired and still reads success.
    let statuses = world.statuses("/pipeline/run-1/jobs/job").await;
    let on_failure = statuses
        .iter()
        .find(|(path, _)| path.ends_with("on_failure/tasks/on-failure-task"));
    assert_eq!(
        on_failure.map(|(_, status)| status.as_str()),
        Some("success")
    );
    // And the failing task's own record still says failure, not ensure's.
    let body = statuses
        .iter()
        .find(|(path, _)| path.ends_with("00/tasks/failing-task"));
    assert_eq!(body.map(|(_, status)| status.as_str()), Some("failure"));
}

#[tokio::test]
async fn do_fixture_reports_the_ensure_failure_code() {
    let world = World::new();
    let group = json!({
        "do": [sh_task("failing-task", "exit 1")],
        "ensure": sh_task("ensure-task", "exit 11")
    });

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [group]})))
        .await;

    assert!(outcome
        .err_string()
        .contains("ensure-task failed with code 11"));
}

#[tokio::test]
async fn try_fixture_swallows_the_failure() {
    let world = World::new();
    let step = json!({"try": [sh_task("failing-task", "exit 1")]});

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [step]})))
        .await;

    assert!(outcome.result.is_ok(), "try must swallow the failure");
}

#[tokio::test]
async fn on_abort_fixture_observes_the_abort_hook() {
    let world = World::new();
    let mut aborting = sh_task("abort-task", "sleep 5");
    aborting["timeout"] = json!("100ms");
    aborting["on_abort"] = sh_task("on-abort-task", "true");

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [aborting]})))
        .await;

    assert!(outcome.err_string().contains("Task abort-task aborted"));

    let statuses = world.statuses("/pipeline/run-1/jobs/job").await;
    let hook = statuses
        .iter()
        .find(|(path, _)| path.ends_with("on_abort/tasks/on-abort-task"));
    assert_eq!(hook.map(|(_, status)| status.as_str()), Some("success"));
}

#[tokio::test]
async fn on_error_fixture_observes_hooks_and_counts_their_asserts() {
    let world = World::new();
    let mut erroring = json!({
        "task": "erroring-task",
        "config": {
            "platform": "linux",
            "image_resource": {"type": "registry-image", "source": {"repository": "alpine"}},
            "run": {"path": "/nonexistent/gantry-resource-binary"}
        }
    });
    erroring["on_error"] = checked_task("on-error-task", "true");
    erroring["ensure"] = checked_task("ensure-task", "true");

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [erroring]})))
        .await;

    assert!(outcome.err_string().contains("Task erroring-task errored"));
    // One assert per hook task that ran.
    assert_eq!(outcome.asserts, 2);
}

/// The all-hooks fixture: every reachable hook fires on a successful run
/// and every assertion holds. The assertion count is locked as the oracle:
///
///   1  main-task code
///   2  main-task on_success code
///   3  main-task ensure code
///   4  try inner on_failure code
///   5  try inner ensure code
///   6  job on_success code
///   7  job ensure code
///   8  job execution order
///   9  pipeline execution order
#[tokio::test]
async fn all_hooks_fixture_succeeds_with_a_locked_assert_count() {
    let world = World::new();

    let mut main_task = checked_task("main-task", "echo main");
    main_task["on_success"] = checked_task("step-on-success", "true");
    main_task["ensure"] = checked_task("step-ensure", "true");

    let mut inner_failing = sh_task("inner-failing", "exit 1");
    inner_failing["on_failure"] = checked_task("inner-on-failure", "true");
    inner_failing["ensure"] = checked_task("inner-ensure", "true");
    let tried = json!({"try": [inner_failing]});

    let job = json!({
        "name": "all-hooks",
        "plan": [main_task, tried],
        "on_success": checked_task("job-on-success", "true"),
        "ensure": checked_task("job-ensure", "true"),
        "assert": {"execution": [
            "main-task",
            "step-on-success",
            "step-ensure",
            "inner-failing",
            "inner-on-failure",
            "inner-ensure",
            "job-on-success",
            "job-ensure"
        ]}
    });

    let outcome = world
        .run(json!({
            "jobs": [job],
            "assert": {"execution": ["all-hooks"]}
        }))
        .await;

    assert!(
        outcome.result.is_ok(),
        "unexpected error: {}",
        outcome.err_string()
    );
    assert_eq!(outcome.asserts, 9, "locked assertion-count oracle moved");
}

#[tokio::test]
async fn ensure_runs_exactly_once_per_invocation() {
    let world = World::new();
    // The ensure task appends to a cache-backed ledger; two runs of the
    // same step in one job would show up as two lines.
    let mut step = sh_task("main", "true");
    step["ensure"] = json!({
        "task": "ledger",
        "config": {
            "platform": "linux",
            "image_resource": {"type": "registry-image", "source": {"repository": "alpine"}},
            "run": {"path": "sh", "args": ["-c", "echo ran >> ledger/entries; wc -l < ledger/entries"]},
            "caches": [{"path": "ledger"}]
        },
        "assert": {"stdout": "1"}
    });

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [step]})))
        .await;
    assert!(
        outcome.result.is_ok(),
        "unexpected error: {}",
        outcome.err_string()
    );
}
