//! Notify step specs: channel dispatch, hook-driven notifications, the
//! fire-and-forget path, and unknown channels.

use crate::prelude::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn notify_step_delivers_to_the_named_channel() {
    let world = World::new();
    let outcome = world
        .run(one_job(json!({
            "name": "announce",
            "plan": [
                sh_task("build", "true"),
                {"notify": "ops", "message": "build green"}
            ]
        })))
        .await;
    assert!(
        outcome.result.is_ok(),
        "unexpected error: {}",
        outcome.err_string()
    );

    let calls = world.notify.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "gantry announce");
    assert_eq!(calls[0].message, "build green");

    // The step recorded its own success under its notify path.
    let statuses = world.statuses("/pipeline/run-1/jobs/announce").await;
    let step = statuses
        .iter()
        .find(|(path, _)| path.ends_with("01/notify/ops"));
    assert_eq!(step.map(|(_, status)| status.as_str()), Some("success"));
}

#[tokio::test]
async fn channel_lists_resolve_each_name() {
    let world = World::new();
    let outcome = world
        .run(one_job(json!({
            "name": "announce",
            "plan": [{"notify": ["ops"], "message": "fanned"}]
        })))
        .await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());

    let calls = world.notify.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, "fanned");
}

#[tokio::test]
async fn failure_hooks_can_notify() {
    let world = World::new();
    let mut failing = sh_task("failing-task", "exit 1");
    failing["on_failure"] = json!({"notify": "ops", "message": "build broke"});

    let outcome = world
        .run(one_job(json!({"name": "job", "plan": [failing]})))
        .await;

    // The notification goes out, the failure still propagates.
    assert!(outcome
        .err_string()
        .contains("failing-task failed with code 1"));
    let calls = world.notify.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, "build broke");
}

#[tokio::test]
async fn async_notify_is_fire_and_forget() {
    let world = World::new();
    let outcome = world
        .run(one_job(json!({
            "name": "job",
            "plan": [{"notify": "ops", "message": "ping", "async": true}]
        })))
        .await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());

    // Delivery happens on a detached task; poll briefly for it to land.
    let mut calls = world.notify.calls();
    for _ in 0..100 {
        if !calls.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        calls = world.notify.calls();
    }
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, "ping");
}

#[tokio::test]
async fn unknown_channel_surfaces_an_error() {
    let world = World::new();
    let outcome = world
        .run(one_job(json!({
            "name": "job",
            "plan": [{"notify": "pager", "message": "nobody listening"}]
        })))
        .await;
    assert!(outcome.err_string().contains("unknown notify channel"));
    assert!(world.notify.calls().is_empty());
}

#[tokio::test]
async fn send_failures_are_logged_but_do_not_fail_the_step() {
    let world = World::new();
    world.notify.fail_with("socket closed");
    let outcome = world
        .run(one_job(json!({
            "name": "job",
            "plan": [{"notify": "ops", "message": "doomed"}]
        })))
        .await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());
}
