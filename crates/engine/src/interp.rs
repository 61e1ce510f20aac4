// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive step interpreter.
//!
//! Dispatch precedence per invocation: the `attempts` retry wrap, then the
//! `across` expansion, then the form itself. After the body settles, the
//! matching outcome hook fires, then `ensure`; a hook's own non-success
//! propagates by the status algebra but never overwrites the body status
//! recorded for the step.

use crate::context::{JobScope, RunContext};
use crate::error::{merge_errors, status_of, EngineError};
use crate::resource;
use crate::task::{execute_task, TaskInvocation};
use gantry_core::{
    parse_duration, AcrossVar, HookSlot, ImageResource, IoRef, Platform, RunConfig, Step,
    StepCommon, StepPath, StepStatus, TaskConfig, TaskStep,
};
use gantry_adapters::{Driver, NotifyAdapter as _};
use gantry_core::task::ImageSource;
use gantry_storage::{StepPayload, Store};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type StepFuture = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'static>>;

/// Evaluates one job's step tree.
///
/// Cheap to clone: everything shared lives behind `Arc`s, which is what
/// lets `in_parallel` children run on spawned tasks.
pub struct Interpreter<D: Driver, S: Store> {
    ctx: Arc<RunContext<D, S>>,
    scope: JobScope,
}

impl<D: Driver, S: Store> Clone for Interpreter<D, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            scope: self.scope.clone(),
        }
    }
}

impl<D: Driver, S: Store> Interpreter<D, S> {
    pub fn new(ctx: Arc<RunContext<D, S>>, scope: JobScope) -> Self {
        Self { ctx, scope }
    }

    /// Execute a step at a storage path, honouring `cancel`.
    ///
    /// Boxed so the recursion through groups, hooks, and spawned parallel
    /// children stays object-sized.
    pub fn execute(&self, step: Step, path: StepPath, cancel: CancellationToken) -> StepFuture {
        let interpreter = self.clone();
        Box::pin(async move { interpreter.execute_inner(step, path, cancel).await })
    }

    async fn execute_inner(
        self,
        step: Step,
        path: StepPath,
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::TaskAborted {
                name: step.display_name(),
            });
        }

        let attempts = step.common().attempts.unwrap_or(1).max(1);
        let timeout = match &step.common().timeout {
            Some(value) => Some(parse_duration(value)?),
            None => None,
        };

        let mut result = Ok(());
        for attempt in 1..=attempts {
            result = self.run_attempt(&step, &path, &cancel, timeout).await;
            if result.is_ok() {
                break;
            }
            if attempt < attempts {
                tracing::info!(
                    step = %step.display_name(),
                    attempt,
                    attempts,
                    "step attempt failed, retrying",
                );
            }
        }

        let status = status_of(&result);
        let hook_error = self.run_hooks(step.common(), &path, status, &cancel).await;
        match merge_errors(result.err(), hook_error) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// One attempt of the body: across expansion or the form dispatch,
    /// bounded by the step timeout. On expiry the step's token subtree is
    /// cancelled so in-flight driver calls abort, and the body is still
    /// awaited; a step never returns before its descendants.
    async fn run_attempt(
        &self,
        step: &Step,
        path: &StepPath,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<(), EngineError> {
        let scoped = cancel.child_token();
        let body = async {
            if step.common().across.is_empty() {
                self.dispatch(step, path, &scoped).await
            } else {
                self.run_across(step, path, &scoped).await
            }
        };

        match timeout {
            None => body.await,
            Some(duration) => {
                tokio::pin!(body);
                tokio::select! {
                    result = &mut body => result,
                    _ = tokio::time::sleep(duration) => {
                        tracing::warn!(step = %step.display_name(), ?duration, "step timed out");
                        scoped.cancel();
                        let result = body.await;
                        match result {
                            // The timeout is the abort even if the body
                            // settled some other way while being torn down.
                            Ok(()) => Err(EngineError::TaskAborted {
                                name: step.display_name(),
                            }),
                            Err(error) => Err(error),
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        step: &Step,
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        match step {
            Step::Task(task) => self.run_task_step(task, path, cancel).await,
            Step::Get(get) => resource::run_get(&self.ctx, &self.scope, get, path, cancel).await,
            Step::Put(put) => resource::run_put(&self.ctx, &self.scope, put, path, cancel).await,
            Step::Do(group) => {
                self.ctx.store.put(path.as_str(), StepPayload::pending()).await?;
                let result = self.run_sequence(&group.steps, path, cancel).await;
                self.ctx
                    .store
                    .put(path.as_str(), StepPayload::terminal(status_of(&result)))
                    .await?;
                result
            }
            Step::Try(group) => {
                self.ctx.store.put(path.as_str(), StepPayload::pending()).await?;
                let result = match self.run_sequence(&group.steps, path, cancel).await {
                    // Failures are swallowed; errors and aborts bypass try.
                    Err(error) if error.status() == StepStatus::Failure => {
                        tracing::info!(%error, "try swallowed failure");
                        Ok(())
                    }
                    other => other,
                };
                self.ctx
                    .store
                    .put(path.as_str(), StepPayload::terminal(status_of(&result)))
                    .await?;
                result
            }
            Step::InParallel(group) => self.run_in_parallel(group, path, cancel).await,
            Step::Notify(notify) => self.run_notify(notify, path, cancel).await,
        }
    }

    async fn run_sequence(
        &self,
        steps: &[Step],
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        for (index, child) in steps.iter().enumerate() {
            self.execute(child.clone(), path.child(index, &child.id()), cancel.clone())
                .await?;
        }
        Ok(())
    }

    async fn run_task_step(
        &self,
        task: &TaskStep,
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.scope.record_task(&task.task);
        let config = self.resolve_task_config(task, path, cancel).await?;
        execute_task(
            &self.ctx,
            &self.scope,
            TaskInvocation {
                name: &task.task,
                config: &config,
                privileged: task.privileged,
                limits: task.container_limits,
                assert: task.common.assert.as_ref(),
                stdin: None,
                timeout: None,
            },
            path,
            cancel,
        )
        .await
        .map(|_| ())
    }

    /// Inline config, or a `file:` indirection: a synthetic task cats the
    /// file from its mount and the output is parsed as a task config.
    async fn resolve_task_config(
        &self,
        task: &TaskStep,
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<TaskConfig, EngineError> {
        if let Some(config) = &task.config {
            return Ok(config.clone());
        }
        let Some(file) = &task.file else {
            return Err(EngineError::TaskErrored {
                name: task.task.clone(),
                message: "task has neither config nor file".to_string(),
            });
        };

        let mount = file.split('/').next().unwrap_or_default();
        if mount.is_empty() {
            return Err(EngineError::TaskErrored {
                name: task.task.clone(),
                message: format!("task file is not under a mount: {file}"),
            });
        }
        let reader = TaskConfig {
            platform: Platform::Linux,
            image_resource: ImageResource {
                type_: "registry-image".to_string(),
                source: ImageSource {
                    repository: "busybox".to_string(),
                    tag: None,
                },
            },
            run: RunConfig {
                path: "cat".to_string(),
                args: vec![file.clone()],
                user: None,
            },
            inputs: vec![IoRef {
                name: mount.to_string(),
            }],
            outputs: Vec::new(),
            caches: Vec::new(),
            env: indexmap::IndexMap::new(),
            container_limits: None,
        };
        let result = execute_task(
            &self.ctx,
            &self.scope,
            TaskInvocation {
                name: &format!("{}.config", task.task),
                config: &reader,
                privileged: false,
                limits: None,
                assert: None,
                stdin: None,
                timeout: None,
            },
            &path.nested("config"),
            cancel,
        )
        .await?;

        serde_yaml::from_str(&result.stdout).map_err(|e| EngineError::TaskErrored {
            name: task.task.clone(),
            message: format!("invalid task config in {file}: {e}"),
        })
    }

    async fn run_in_parallel(
        &self,
        group: &gantry_core::InParallelStep,
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let config = &group.in_parallel;
        self.ctx.store.put(path.as_str(), StepPayload::pending()).await?;

        let group_cancel = cancel.child_token();
        let limit = config.limit.unwrap_or(config.steps.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let fail_fast = config.fail_fast;

        let mut join_set: JoinSet<(usize, Result<(), EngineError>)> = JoinSet::new();
        for (index, child) in config.steps.iter().enumerate() {
            let interpreter = self.clone();
            let child = child.clone();
            let child_path = path.child(index, &child.id());
            let token = group_cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() {
                    return (
                        index,
                        Err(EngineError::TaskAborted {
                            name: child.display_name(),
                        }),
                    );
                }
                (index, interpreter.execute(child, child_path, token).await)
            });
        }

        let mut failures: Vec<(usize, EngineError)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(error))) => {
                    if fail_fast && !group_cancel.is_cancelled() {
                        tracing::info!(%error, "fail_fast cancelling parallel siblings");
                        group_cancel.cancel();
                    }
                    failures.push((index, error));
                }
                Err(join_error) => {
                    failures.push((
                        usize::MAX,
                        EngineError::TaskErrored {
                            name: "in_parallel".to_string(),
                            message: join_error.to_string(),
                        },
                    ));
                }
            }
        }

        let result = match pick_group_error(failures) {
            Some(error) => Err(error),
            None => Ok(()),
        };
        self.ctx
            .store
            .put(path.as_str(), StepPayload::terminal(status_of(&result)))
            .await?;
        result
    }

    /// Expand the across matrix: the Cartesian product of all variable
    /// values, in declaration order, each combination a rewritten copy of
    /// the step executed at its own path.
    async fn run_across(
        &self,
        step: &Step,
        path: &StepPath,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let common = step.common();
        let combinations = expand_bindings(&common.across);
        let fail_fast = common.fail_fast.unwrap_or(false);
        let max_in_flight = common
            .across
            .iter()
            .filter_map(|var| var.max_in_flight)
            .max()
            .unwrap_or(1)
            .max(1);

        if max_in_flight == 1 {
            let mut failures = Vec::new();
            for (index, bindings) in combinations.iter().enumerate() {
                let combo = rewrite_for_binding(step, bindings);
                let combo_path = path.across(index, bindings);
                if let Err(error) = self
                    .execute(combo, combo_path, cancel.clone())
                    .await
                {
                    failures.push((index, error));
                    if fail_fast {
                        break;
                    }
                }
            }
            return match pick_group_error(failures) {
                Some(error) => Err(error),
                None => Ok(()),
            };
        }

        let group_cancel = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(max_in_flight));
        let mut join_set: JoinSet<(usize, Result<(), EngineError>)> = JoinSet::new();
        for (index, bindings) in combinations.iter().enumerate() {
            let interpreter = self.clone();
            let combo = rewrite_for_binding(step, bindings);
            let combo_path = path.across(index, bindings);
            let token = group_cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() {
                    return (
                        index,
                        Err(EngineError::TaskAborted {
                            name: combo.display_name(),
                        }),
                    );
                }
                (index, interpreter.execute(combo, combo_path, token).await)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(error))) => {
                    if fail_fast && !group_cancel.is_cancelled() {
                        group_cancel.cancel();
                    }
                    failures.push((index, error));
                }
                Err(join_error) => failures.push((
                    usize::MAX,
                    EngineError::TaskErrored {
                        name: step.display_name(),
                        message: join_error.to_string(),
                    },
                )),
            }
        }
        match pick_group_error(failures) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn run_notify(
        &self,
        notify: &gantry_core::NotifyStep,
        path: &StepPath,
        _cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.ctx.store.put(path.as_str(), StepPayload::pending()).await?;

        let title = format!("gantry {}", self.scope.job);
        let result = async {
            for channel in notify.notify.names() {
                let adapter =
                    self.ctx
                        .notify
                        .get(channel)
                        .ok_or_else(|| EngineError::TaskErrored {
                            name: format!("notify {channel}"),
                            message: "unknown notify channel".to_string(),
                        })?;
                if notify.fire_and_forget {
                    let title = title.clone();
                    let message = notify.message.clone();
                    let channel = channel.to_string();
                    tokio::spawn(async move {
                        if let Err(error) = adapter.notify(&title, &message).await {
                            tracing::warn!(%channel, %error, "notification send failed");
                        }
                    });
                } else if let Err(error) = adapter.notify(&title, &notify.message).await {
                    // Send failures are logged, never fatal.
                    tracing::warn!(%channel, %error, "notification send failed");
                }
            }
            Ok(())
        }
        .await;

        self.ctx
            .store
            .put(path.as_str(), StepPayload::terminal(status_of(&result)))
            .await?;
        result
    }

    /// Fire the outcome hook then `ensure`. Hooks run even after the run
    /// was cancelled (best-effort cleanup), so they get a fresh token when
    /// the step's own token is already cancelled.
    async fn run_hooks(
        &self,
        common: &StepCommon,
        path: &StepPath,
        status: StepStatus,
        cancel: &CancellationToken,
    ) -> Option<EngineError> {
        let hook_cancel = if cancel.is_cancelled() {
            CancellationToken::new()
        } else {
            cancel.clone()
        };

        let mut hook_error = None;
        let slot = status.hook_slot();
        if let Some(hook) = common.hook(slot) {
            let result = self
                .execute(hook.clone(), path.hook(slot), hook_cancel.clone())
                .await;
            hook_error = merge_errors(hook_error, result.err());
        }
        if let Some(ensure) = common.hook(HookSlot::Ensure) {
            let result = self
                .execute(ensure.clone(), path.hook(HookSlot::Ensure), hook_cancel)
                .await;
            hook_error = merge_errors(hook_error, result.err());
        }
        hook_error
    }
}

/// Highest-severity failure, earliest index breaking ties.
fn pick_group_error(mut failures: Vec<(usize, EngineError)>) -> Option<EngineError> {
    failures.sort_by_key(|(index, _)| *index);
    let mut chosen: Option<EngineError> = None;
    for (_, error) in failures {
        chosen = match chosen {
            None => Some(error),
            Some(current) => {
                if error.status().combine(current.status()) == error.status()
                    && error.status() != current.status()
                {
                    Some(error)
                } else {
                    Some(current)
                }
            }
        };
    }
    chosen
}

/// Ordered Cartesian product of across variable values, rendered to
/// strings.
fn expand_bindings(vars: &[AcrossVar]) -> Vec<Vec<(String, String)>> {
    let mut combinations: Vec<Vec<(String, String)>> = vec![Vec::new()];
    for var in vars {
        let mut next = Vec::with_capacity(combinations.len() * var.values.len().max(1));
        for combination in &combinations {
            for value in &var.values {
                let mut extended = combination.clone();
                extended.push((var.var.clone(), render_value(value)));
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Copy of the step for one across combination: bindings merged into the
/// task env, the modifier fields and hooks cleared (hooks fire once on the
/// step as a whole).
fn rewrite_for_binding(step: &Step, bindings: &[(String, String)]) -> Step {
    let mut combo = step.clone();
    {
        let common = combo.common_mut();
        common.across = Vec::new();
        common.fail_fast = None;
        common.attempts = None;
        common.timeout = None;
        common.on_success = None;
        common.on_failure = None;
        common.on_error = None;
        common.on_abort = None;
        common.ensure = None;
    }
    if let Step::Task(task) = &mut combo {
        if let Some(config) = &mut task.config {
            for (var, value) in bindings {
                config.env.insert(var.clone(), value.clone());
            }
        }
    }
    combo
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;
