// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline scheduler: runs jobs topologically, honouring `passed`
//! constraints.

use crate::context::{EngineDeps, RunContext};
use crate::error::{merge_errors, EngineError};
use crate::job::run_job;
use gantry_adapters::Driver;
use gantry_core::{validate_with_types, PipelineConfig, PipelineId, RunId, StepStatus};
use gantry_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives one pipeline invocation end to end.
pub struct PipelineRunner<D: Driver, S: Store> {
    ctx: Arc<RunContext<D, S>>,
}

impl<D: Driver, S: Store> PipelineRunner<D, S> {
    pub fn new(
        config: PipelineConfig,
        deps: EngineDeps<D, S>,
        run_id: RunId,
        pipeline_id: PipelineId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx: RunContext::new(config, deps, run_id, pipeline_id, cancel),
        }
    }

    pub fn context(&self) -> &Arc<RunContext<D, S>> {
        &self.ctx
    }

    /// Validate, then run jobs: roots sequentially in declaration order,
    /// dependents as soon as every job they reference through `passed` has
    /// succeeded. A job whose dependency failed is skipped. Returns the
    /// first responsible error; the full history lives in the store.
    pub async fn run(&self) -> Result<(), EngineError> {
        let config = &self.ctx.config;
        let native_types = self.ctx.resources.type_names();
        let native_refs: Vec<&str> = native_types.iter().map(String::as_str).collect();
        validate_with_types(config, &native_refs)?;

        let depends_on: HashMap<&str, Vec<String>> = config
            .jobs
            .iter()
            .map(|job| (job.name.as_str(), job.depends_on()))
            .collect();
        let mut statuses: HashMap<&str, StepStatus> = HashMap::new();
        let mut first_error: Option<EngineError> = None;

        loop {
            if self.ctx.cancel.is_cancelled() {
                tracing::warn!("pipeline cancelled, not scheduling further jobs");
                break;
            }

            let next = config.jobs.iter().find(|job| {
                !statuses.contains_key(job.name.as_str())
                    && depends_on[job.name.as_str()].iter().all(|dependency| {
                        statuses.get(dependency.as_str()) == Some(&StepStatus::Success)
                    })
            });
            let Some(job) = next else {
                break;
            };

            match run_job(&self.ctx, job, &self.ctx.cancel).await {
                Ok(()) => {
                    statuses.insert(job.name.as_str(), StepStatus::Success);
                }
                Err(error) => {
                    tracing::warn!(job = %job.name, %error, "job did not succeed");
                    statuses.insert(job.name.as_str(), error.status());
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        for job in &config.jobs {
            if !statuses.contains_key(job.name.as_str()) {
                tracing::info!(job = %job.name, "job skipped: dependency did not succeed");
            }
        }

        if self.ctx.cancel.is_cancelled() && first_error.is_none() {
            first_error = Some(EngineError::TaskAborted {
                name: "pipeline".to_string(),
            });
        }

        if let Some(expected) = config.assert.as_ref().and_then(|a| a.execution.as_ref()) {
            let observed = self.ctx.jobs_run();
            let check = self.ctx.check(
                "pipeline execution",
                observed == *expected,
                format!("expected {expected:?}, observed {observed:?}"),
            );
            // The first responsible error stays the reported one on a tie.
            first_error = merge_errors(check.err(), first_error);
        }

        if let Err(error) = self.ctx.driver.close().await {
            tracing::warn!(%error, "driver close failed");
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
