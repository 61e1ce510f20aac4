//! Resource versioning specs: `every` mode across runs, pinned idempotence,
//! and pipeline-scoped isolation.

use crate::prelude::*;
use serde_json::json;
use similar_asserts::assert_eq;

fn get_pipeline(versions: &[&str], version_field: serde_json::Value) -> serde_json::Value {
    let mut get = json!({"get": "repo"});
    if !version_field.is_null() {
        get["version"] = version_field;
    }
    json!({
        "jobs": [{"name": "consume", "plan": [get]}],
        "resources": {"repo": {"type": "mock", "source": {"versions": versions}}}
    })
}

#[tokio::test]
async fn every_mode_consumes_one_new_version_per_run() {
    let world = World::new();

    // The upstream grows by one version between runs.
    for (run, versions) in [
        (1, vec!["v1"]),
        (2, vec!["v1", "v2"]),
        (3, vec!["v1", "v2", "v3"]),
    ] {
        let outcome = world
            .run(get_pipeline(&versions, json!("every")))
            .await;
        assert!(
            outcome.result.is_ok(),
            "run {run} failed: {}",
            outcome.err_string()
        );
    }

    let log = world.version_log("specpipeline/repo").await;
    assert_eq!(
        log,
        vec![version("v3"), version("v2"), version("v1")],
        "three distinct stored versions, newest first"
    );
}

#[tokio::test]
async fn every_mode_log_has_no_duplicates_when_the_stream_stalls() {
    let world = World::new();
    for _ in 0..3 {
        let outcome = world.run(get_pipeline(&["v1"], json!("every"))).await;
        assert!(outcome.result.is_ok());
    }
    assert_eq!(world.version_log("specpipeline/repo").await, vec![version("v1")]);
}

#[tokio::test]
async fn pinned_rerun_appends_nothing_new() {
    let world = World::new();
    let config = get_pipeline(&["v1", "v2", "v3"], json!({"version": "v2"}));

    let first = world.run(config.clone()).await;
    assert!(first.result.is_ok(), "{}", first.err_string());
    let after_first = world.version_log("specpipeline/repo").await;

    let second = world.run(config).await;
    assert!(second.result.is_ok(), "{}", second.err_string());
    let after_second = world.version_log("specpipeline/repo").await;

    assert_eq!(after_first, after_second);
    assert_eq!(after_second, vec![version("v2")]);
}

#[tokio::test]
async fn latest_mode_tracks_the_newest_version() {
    let world = World::new();
    let outcome = world
        .run(get_pipeline(&["v1", "v2"], serde_json::Value::Null))
        .await;
    assert!(outcome.result.is_ok());
    assert_eq!(world.version_log("specpipeline/repo").await, vec![version("v2")]);
}

#[tokio::test]
async fn version_logs_are_isolated_between_pipelines() {
    let world = World::new();

    let a = world
        .run_as("pipeline-aaaa", get_pipeline(&["a1"], serde_json::Value::Null))
        .await;
    assert!(a.result.is_ok());
    let b = world
        .run_as("pipeline-bbbb", get_pipeline(&["b1"], serde_json::Value::Null))
        .await;
    assert!(b.result.is_ok());

    assert_eq!(
        world.version_log("pipeline-aaaa/repo").await,
        vec![version("a1")]
    );
    assert_eq!(
        world.version_log("pipeline-bbbb/repo").await,
        vec![version("b1")]
    );
}

#[tokio::test]
async fn put_then_get_shares_the_version_log() {
    let world = World::new();
    let config = json!({
        "jobs": [{
            "name": "publish",
            "plan": [
                {"put": "repo", "params": {"version": "built-1"}},
                {"get": "repo", "version": {"version": "built-1"}}
            ]
        }],
        "resources": {"repo": {"type": "mock", "source": {"versions": ["built-1"]}}}
    });
    let outcome = world.run(config).await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());
    assert_eq!(
        world.version_log("specpipeline/repo").await,
        vec![version("built-1")]
    );
}

#[tokio::test]
async fn fetched_artifacts_are_visible_to_later_tasks() {
    let world = World::new();
    let config = json!({
        "jobs": [{
            "name": "consume",
            "plan": [
                {"get": "repo"},
                {
                    "task": "reader",
                    "config": {
                        "platform": "linux",
                        "image_resource": {"type": "registry-image", "source": {"repository": "alpine"}},
                        "run": {"path": "sh", "args": ["-c", "cat repo/greeting.txt"]},
                        "inputs": [{"name": "repo"}]
                    },
                    "assert": {"stdout": "hello-from-resource"}
                }
            ]
        }],
        "resources": {"repo": {"type": "mock", "source": {
            "versions": ["1"],
            "files": {"greeting.txt": "hello-from-resource"}
        }}}
    });
    let outcome = world.run(config).await;
    assert!(outcome.result.is_ok(), "{}", outcome.err_string());
}
