//! Shared helpers for the behavioural specs.

#![allow(dead_code)]

use gantry_adapters::{FakeNotifyAdapter, NativeDriver, NotifyRegistry, ResourceRegistry};
use gantry_core::{PipelineConfig, PipelineId, RunId};
use gantry_engine::{EngineDeps, EngineError, PipelineRunner};
use gantry_storage::{MemoryStore, Store as _, StoreRecord};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// One engine world: a store and a driver root shared by however many
/// pipeline runs a spec performs.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub notify: FakeNotifyAdapter,
    tmp: TempDir,
    run_counter: std::sync::atomic::AtomicU64,
}

/// Outcome of one pipeline run.
pub struct RunOutcome {
    pub result: Result<(), EngineError>,
    pub asserts: u64,
    pub jobs_run: Vec<String>,
    pub run_id: String,
}

impl World {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            notify: FakeNotifyAdapter::new(),
            tmp: tempfile::tempdir().unwrap(),
            run_counter: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Run a pipeline definition under the given pipeline ID.
    pub async fn run_as(&self, pipeline_id: &str, config: serde_json::Value) -> RunOutcome {
        let config: PipelineConfig = serde_json::from_value(config).unwrap();
        let seq = self
            .run_counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let run_id = format!("run-{seq}");

        let driver = Arc::new(NativeDriver::new(self.tmp.path(), pipeline_id));
        let mut notify = NotifyRegistry::new();
        notify.insert("ops", self.notify.clone());
        let runner = PipelineRunner::new(
            config,
            EngineDeps {
                driver,
                store: Arc::clone(&self.store),
                resources: ResourceRegistry::builtin(),
                notify,
            },
            RunId::new(run_id.clone()),
            PipelineId::new(pipeline_id),
            CancellationToken::new(),
        );
        let result = runner.run().await;
        RunOutcome {
            result,
            asserts: runner.context().assert_count(),
            jobs_run: runner.context().jobs_run(),
            run_id,
        }
    }

    /// Run under a fixed default pipeline ID.
    pub async fn run(&self, config: serde_json::Value) -> RunOutcome {
        self.run_as("specpipeline", config).await
    }

    /// All records under a prefix projected to their status.
    pub async fn statuses(&self, prefix: &str) -> Vec<(String, String)> {
        self.records(prefix, &["status"])
            .await
            .into_iter()
            .map(|record| {
                let status = record.fields["status"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                (record.path, status)
            })
            .collect()
    }

    pub async fn records(&self, prefix: &str, fields: &[&str]) -> Vec<StoreRecord> {
        self.store.get_all(prefix, fields).await.unwrap()
    }

    /// Version log for `{pipeline_id}/{resource}`, newest first.
    pub async fn version_log(&self, scoped: &str) -> Vec<gantry_core::Version> {
        self.store
            .list_resource_versions(scoped, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.version)
            .collect()
    }
}

impl RunOutcome {
    pub fn err_string(&self) -> String {
        match &self.result {
            Ok(()) => String::new(),
            Err(error) => error.to_string(),
        }
    }
}

/// Fluent builder for black-box `gantry` invocations.
pub struct CliBuilder {
    command: assert_cmd::Command,
}

/// Create a CLI builder for gantry commands.
pub fn gantry() -> CliBuilder {
    CliBuilder {
        command: assert_cmd::Command::cargo_bin("gantry").unwrap(),
    }
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.command.args(args);
        self
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.command.arg(arg);
        self
    }

    fn output(mut self) -> CliOutput {
        let output = self.command.output().unwrap();
        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        }
    }

    /// Run and require exit code zero.
    pub fn passes(self) -> CliOutput {
        let output = self.output();
        assert!(
            output.success,
            "expected success, got failure\nstdout: {}\nstderr: {}",
            output.stdout, output.stderr
        );
        output
    }

    /// Run and require a non-zero exit code.
    pub fn fails(self) -> CliOutput {
        let output = self.output();
        assert!(
            !output.success,
            "expected failure, got success\nstdout: {}",
            output.stdout
        );
        output
    }
}

pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CliOutput {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing {needle:?}: {}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing {needle:?}: {}",
            self.stderr
        );
        self
    }
}

/// A task step running a shell script.
pub fn sh_task(name: &str, script: &str) -> serde_json::Value {
    serde_json::json!({
        "task": name,
        "config": {
            "platform": "linux",
            "image_resource": {"type": "registry-image", "source": {"repository": "alpine"}},
            "run": {"path": "sh", "args": ["-c", script]}
        }
    })
}

/// A task step whose exit code is asserted to be zero.
pub fn checked_task(name: &str, script: &str) -> serde_json::Value {
    let mut task = sh_task(name, script);
    task["assert"] = serde_json::json!({"code": 0});
    task
}

/// A single-job pipeline.
pub fn one_job(job: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"jobs": [job]})
}

/// A version map `{ "version": v }`.
pub fn version(v: &str) -> gantry_core::Version {
    let mut map = gantry_core::Version::new();
    map.insert("version".to_string(), v.to_string());
    map
}
