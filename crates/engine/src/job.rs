// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner: a job's plan is an implicit `do` group with job-level hooks
//! and an optional execution-order assertion.

use crate::context::{JobScope, RunContext};
use crate::error::{merge_errors, status_of, EngineError};
use crate::interp::Interpreter;
use gantry_adapters::Driver;
use gantry_core::{parse_duration, HookSlot, Job, Step, StepPath, StepStatus};
use gantry_storage::{StepPayload, Store};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run one job to completion, recording its status and `dependsOn` list.
pub async fn run_job<D: Driver, S: Store>(
    ctx: &Arc<RunContext<D, S>>,
    job: &Job,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    ctx.record_job(&job.name);
    let scope = JobScope::new(&job.name);
    let interpreter = Interpreter::new(Arc::clone(ctx), scope.clone());
    let path = StepPath::job_root(&ctx.run_id, &job.name);
    let depends_on = job.depends_on();

    tracing::info!(job = %job.name, "job started");
    ctx.store
        .put(
            path.as_str(),
            StepPayload::pending().with_depends_on(depends_on.clone()),
        )
        .await?;

    let result = run_plan(ctx, &interpreter, job, &path, cancel).await;
    let status = status_of(&result);
    ctx.store
        .put(
            path.as_str(),
            StepPayload::terminal(status).with_depends_on(depends_on),
        )
        .await?;
    tracing::info!(job = %job.name, %status, "job finished");

    let hook_error = run_job_hooks(&interpreter, job, &path, status, cancel).await;
    let mut outcome = merge_errors(result.err(), hook_error);

    if let Some(expected) = job.assert.as_ref().and_then(|a| a.execution.as_ref()) {
        let observed = scope.tasks_run();
        let check = ctx.check(
            &format!("job {} execution", job.name),
            observed == *expected,
            format!("expected {expected:?}, observed {observed:?}"),
        );
        // The body's error stays the reported one on a severity tie.
        outcome = merge_errors(check.err(), outcome);
    }

    match outcome {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

async fn run_plan<D: Driver, S: Store>(
    ctx: &Arc<RunContext<D, S>>,
    interpreter: &Interpreter<D, S>,
    job: &Job,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let timeout = match &job.timeout {
        Some(value) => Some(parse_duration(value)?),
        None => None,
    };
    let job_cancel = cancel.child_token();

    let body = run_steps(interpreter, &job.plan, path, &job_cancel);
    match timeout {
        None => body.await,
        Some(duration) => {
            tokio::pin!(body);
            tokio::select! {
                result = &mut body => result,
                _ = tokio::time::sleep(duration) => {
                    tracing::warn!(job = %job.name, ?duration, "job timed out");
                    job_cancel.cancel();
                    let result = body.await;
                    match result {
                        Ok(()) => Err(EngineError::TaskAborted {
                            name: job.name.clone(),
                        }),
                        Err(error) => Err(error),
                    }
                }
            }
        }
    }
}

async fn run_steps<D: Driver, S: Store>(
    interpreter: &Interpreter<D, S>,
    plan: &[Step],
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    for (index, step) in plan.iter().enumerate() {
        interpreter
            .execute(step.clone(), path.child(index, &step.id()), cancel.clone())
            .await?;
    }
    Ok(())
}

async fn run_job_hooks<D: Driver, S: Store>(
    interpreter: &Interpreter<D, S>,
    job: &Job,
    path: &StepPath,
    status: StepStatus,
    cancel: &CancellationToken,
) -> Option<EngineError> {
    let hook_cancel = if cancel.is_cancelled() {
        CancellationToken::new()
    } else {
        cancel.clone()
    };

    let slot = status.hook_slot();
    let outcome_hook = match slot {
        HookSlot::OnSuccess => job.on_success.as_ref(),
        HookSlot::OnFailure => job.on_failure.as_ref(),
        HookSlot::OnError => job.on_error.as_ref(),
        HookSlot::OnAbort => job.on_abort.as_ref(),
        HookSlot::Ensure => None,
    };

    let mut hook_error = None;
    if let Some(hook) = outcome_hook {
        let result = interpreter
            .execute(hook.clone(), path.hook(slot), hook_cancel.clone())
            .await;
        hook_error = merge_errors(hook_error, result.err());
    }
    if let Some(ensure) = &job.ensure {
        let result = interpreter
            .execute(ensure.clone(), path.hook(HookSlot::Ensure), hook_cancel)
            .await;
        hook_error = merge_errors(hook_error, result.err());
    }
    hook_error
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
