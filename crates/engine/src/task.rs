// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task executor: prepares mounts, invokes the driver, records the result,
//! and evaluates per-step assertions.

use crate::context::{JobScope, RunContext};
use crate::error::EngineError;
use gantry_adapters::{Driver, Mount, RunCommand, RunSpec, RunStatus};
use gantry_core::{ContainerLimits, StepAssert, StepPath, StepStatus, TaskConfig};
use gantry_storage::{StepPayload, Store};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Captured output of a completed, successful task.
#[derive(Debug, Clone)]
pub(crate) struct TaskResult {
    pub code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// Inputs to one task invocation beyond its config.
pub(crate) struct TaskInvocation<'a> {
    pub name: &'a str,
    pub config: &'a TaskConfig,
    pub privileged: bool,
    pub limits: Option<ContainerLimits>,
    pub assert: Option<&'a StepAssert>,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

/// Run one task to termination and persist its record at `path`.
pub(crate) async fn execute_task<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    invocation: TaskInvocation<'_>,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<TaskResult, EngineError> {
    let TaskInvocation {
        name,
        config,
        privileged,
        limits,
        assert,
        stdin,
        timeout,
    } = invocation;

    let mut mounts = Vec::new();
    for input in &config.inputs {
        let volume = scope
            .mounts
            .artifact(ctx.driver.as_ref(), &input.name)
            .await
            .map_err(|e| errored(name, e))?;
        mounts.push(Mount {
            volume,
            at: input.name.clone(),
        });
    }
    for output in &config.outputs {
        let volume = scope
            .mounts
            .artifact(ctx.driver.as_ref(), &output.name)
            .await
            .map_err(|e| errored(name, e))?;
        mounts.push(Mount {
            volume,
            at: output.name.clone(),
        });
    }
    for cache in &config.caches {
        let (volume, at) = scope
            .mounts
            .cache(ctx.driver.as_ref(), &cache.path)
            .await
            .map_err(|e| errored(name, e))?;
        mounts.push(Mount { volume, at });
    }

    ctx.store.put(path.as_str(), StepPayload::pending()).await?;

    let spec = RunSpec {
        name: name.to_string(),
        image: Some(config.image_resource.image_ref()),
        command: RunCommand {
            path: config.run.path.clone(),
            args: config.run.args.clone(),
            user: config.run.user.clone(),
        },
        env: config.env.clone(),
        mounts,
        privileged,
        stdin,
        timeout,
        limits: limits.or(config.container_limits),
    };

    let output = match ctx.driver.run(spec, cancel.clone()).await {
        Ok(output) => output,
        Err(driver_error) => {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(StepStatus::Error)
                        .with_message(driver_error.to_string()),
                )
                .await?;
            return Err(errored(name, driver_error));
        }
    };

    if output.status == RunStatus::Abort {
        let mut payload = StepPayload::terminal(StepStatus::Abort)
            .with_code(output.code)
            .with_output(output.stdout, output.stderr);
        if let Some(message) = output.message {
            payload = payload.with_message(message);
        }
        ctx.store.put(path.as_str(), payload).await?;
        return Err(EngineError::TaskAborted {
            name: name.to_string(),
        });
    }

    if output.code != 0 {
        ctx.store
            .put(
                path.as_str(),
                StepPayload::terminal(StepStatus::Failure)
                    .with_code(output.code)
                    .with_output(output.stdout, output.stderr),
            )
            .await?;
        return Err(EngineError::TaskFailed {
            name: name.to_string(),
            code: output.code,
        });
    }

    ctx.store
        .put(
            path.as_str(),
            StepPayload::terminal(StepStatus::Success)
                .with_code(output.code)
                .with_output(output.stdout.clone(), output.stderr.clone()),
        )
        .await?;

    if let Some(assert) = assert {
        if let Err(assertion) = eval_asserts(ctx, name, assert, &output.stdout, &output.stderr, output.code) {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(StepStatus::Failure)
                        .with_code(output.code)
                        .with_output(output.stdout, output.stderr)
                        .with_message(assertion.to_string()),
                )
                .await?;
            return Err(assertion);
        }
    }

    Ok(TaskResult {
        code: output.code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

fn eval_asserts<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    name: &str,
    assert: &StepAssert,
    stdout: &str,
    stderr: &str,
    code: i64,
) -> Result<(), EngineError> {
    if let Some(expected) = &assert.stdout {
        ctx.check(
            &format!("task {name} stdout"),
            stdout.contains(expected),
            format!("expected stdout to contain {expected:?}, got {stdout:?}"),
        )?;
    }
    if let Some(expected) = &assert.stderr {
        ctx.check(
            &format!("task {name} stderr"),
            stderr.contains(expected),
            format!("expected stderr to contain {expected:?}, got {stderr:?}"),
        )?;
    }
    if let Some(expected) = assert.code {
        ctx.check(
            &format!("task {name} code"),
            code == expected,
            format!("expected exit code {expected}, got {code}"),
        )?;
    }
    Ok(())
}

fn errored(name: &str, error: impl std::fmt::Display) -> EngineError {
    EngineError::TaskErrored {
        name: name.to_string(),
        message: error.to_string(),
    }
}
