// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation execution context and per-job scope.

use crate::error::EngineError;
use crate::mounts::MountSet;
use gantry_adapters::{Driver, NotifyRegistry, ResourceRegistry};
use gantry_core::{PipelineConfig, PipelineId, RunId};
use gantry_storage::Store;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// External capabilities the engine runs against.
pub struct EngineDeps<D: Driver, S: Store> {
    pub driver: Arc<D>,
    pub store: Arc<S>,
    pub resources: ResourceRegistry,
    pub notify: NotifyRegistry,
}

/// Shared state for one pipeline invocation.
///
/// Constructed once per run and handed around behind an `Arc`; the
/// cancellation token is the root of the whole run's token tree.
pub struct RunContext<D: Driver, S: Store> {
    pub config: PipelineConfig,
    pub run_id: RunId,
    pub pipeline_id: PipelineId,
    pub driver: Arc<D>,
    pub store: Arc<S>,
    pub resources: ResourceRegistry,
    pub notify: NotifyRegistry,
    pub cancel: CancellationToken,
    jobs_run: Mutex<Vec<String>>,
    asserts: AtomicU64,
}

impl<D: Driver, S: Store> RunContext<D, S> {
    pub fn new(
        config: PipelineConfig,
        deps: EngineDeps<D, S>,
        run_id: RunId,
        pipeline_id: PipelineId,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            run_id,
            pipeline_id,
            driver: deps.driver,
            store: deps.store,
            resources: deps.resources,
            notify: deps.notify,
            cancel,
            jobs_run: Mutex::new(Vec::new()),
            asserts: AtomicU64::new(0),
        })
    }

    /// Record that a job started executing (pipeline execution order).
    pub fn record_job(&self, name: &str) {
        self.jobs_run.lock().push(name.to_string());
    }

    /// Job names in execution order.
    pub fn jobs_run(&self) -> Vec<String> {
        self.jobs_run.lock().clone()
    }

    /// Number of assertion evaluations so far.
    pub fn assert_count(&self) -> u64 {
        self.asserts.load(Ordering::SeqCst)
    }

    /// Evaluate one assertion: log it, count it, and fail the step when it
    /// does not hold.
    pub fn check(&self, what: &str, ok: bool, detail: String) -> Result<(), EngineError> {
        self.asserts.fetch_add(1, Ordering::SeqCst);
        tracing::info!(target: "assert", check = what, ok, "assert");
        if ok {
            Ok(())
        } else {
            Err(EngineError::AssertionFailed(format!("{what}: {detail}")))
        }
    }
}

/// Per-job scope: the mount map shared by the job's tasks and the ordered
/// record of task names it executed.
#[derive(Clone)]
pub struct JobScope {
    pub job: String,
    pub mounts: Arc<MountSet>,
    tasks_run: Arc<Mutex<Vec<String>>>,
}

impl JobScope {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            mounts: Arc::new(MountSet::new()),
            tasks_run: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record_task(&self, name: &str) {
        self.tasks_run.lock().push(name.to_string());
    }

    /// Task names in execution order.
    pub fn tasks_run(&self) -> Vec<String> {
        self.tasks_run.lock().clone()
    }
}
