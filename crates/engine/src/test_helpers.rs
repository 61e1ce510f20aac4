// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.
#![allow(clippy::unwrap_used)]

use crate::context::{EngineDeps, JobScope, RunContext};
use crate::interp::Interpreter;
use gantry_adapters::{FakeNotifyAdapter, NativeDriver, NotifyRegistry, ResourceRegistry};
use gantry_core::{PipelineConfig, PipelineId, RunId, Step, StepPath};
use gantry_storage::{MemoryStore, Store};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub(crate) struct Harness {
    pub ctx: Arc<RunContext<NativeDriver, MemoryStore>>,
    pub store: Arc<MemoryStore>,
    pub notify: FakeNotifyAdapter,
    _tmp: TempDir,
}

impl Harness {
    /// Harness around a full pipeline config value.
    pub fn new(config: serde_json::Value) -> Self {
        let config: PipelineConfig = serde_json::from_value(config).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(NativeDriver::new(tmp.path(), "test"));
        let store = Arc::new(MemoryStore::new());
        let fake = FakeNotifyAdapter::new();
        let mut notify = NotifyRegistry::new();
        notify.insert("ops", fake.clone());
        let deps = EngineDeps {
            driver,
            store: Arc::clone(&store),
            resources: ResourceRegistry::builtin(),
            notify,
        };
        let ctx = RunContext::new(
            config,
            deps,
            RunId::new("run-1"),
            PipelineId::new("pid00000000"),
            CancellationToken::new(),
        );
        Self {
            ctx,
            store,
            notify: fake,
            _tmp: tmp,
        }
    }

    /// Harness with an empty single-job pipeline, for direct step runs.
    pub fn bare() -> Self {
        Self::new(json!({"jobs": [{"name": "job", "plan": [sh_task("noop", "true")]}]}))
    }

    pub fn interpreter(&self) -> (Interpreter<NativeDriver, MemoryStore>, JobScope) {
        let scope = JobScope::new("job");
        (
            Interpreter::new(Arc::clone(&self.ctx), scope.clone()),
            scope,
        )
    }

    /// Execute one step at index 0 of the harness job.
    pub async fn run_step(&self, step: serde_json::Value) -> Result<(), crate::EngineError> {
        let step: Step = serde_json::from_value(step).unwrap();
        let (interpreter, _scope) = self.interpreter();
        let path = StepPath::job_root(&self.ctx.run_id, "job").child(0, &step.id());
        interpreter
            .execute(step, path, self.ctx.cancel.clone())
            .await
    }

    /// Projected status fields for every record under the job.
    pub async fn statuses(&self) -> Vec<(String, String)> {
        self.store
            .get_all("/pipeline/run-1/jobs/job", &["status"])
            .await
            .unwrap()
            .into_iter()
            .map(|record| {
                let status = record.fields["status"].as_str().unwrap_or_default().to_string();
                (record.path, status)
            })
            .collect()
    }

    /// Status recorded at one exact path.
    pub async fn status_at(&self, path: &str) -> Option<String> {
        self.statuses()
            .await
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, status)| status)
    }
}

/// A task step running a shell script.
pub(crate) fn sh_task(name: &str, script: &str) -> serde_json::Value {
    json!({
        "task": name,
        "config": sh_config(script)
    })
}

/// A task config running a shell script.
pub(crate) fn sh_config(script: &str) -> serde_json::Value {
    json!({
        "platform": "linux",
        "image_resource": {"type": "registry-image", "source": {"repository": "alpine"}},
        "run": {"path": "sh", "args": ["-c", script]}
    })
}
