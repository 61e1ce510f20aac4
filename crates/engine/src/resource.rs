// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource protocol: check / in / out against a native implementation or a
//! resource-type image, plus version-mode selection.
//!
//! External resource types speak JSON over stdin/stdout:
//! check takes `{source, version?}` and emits `[version, ...]`; in takes
//! `{source, version, params?}`; out takes `{source, params?}` and emits
//! `{version, ...}`.

use crate::context::{JobScope, RunContext};
use crate::error::EngineError;
use crate::task::{execute_task, TaskInvocation, TaskResult};
use gantry_adapters::{Driver, NativeResource as _};
use gantry_core::{
    scoped_name, GetStep, ImageResource, IoRef, Platform, PutStep, Resource, RunConfig, SourceMap,
    StepPath, StepStatus, TaskConfig, Version, VersionMode,
};
use gantry_core::task::ImageSource;
use gantry_storage::{StepPayload, Store};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Execute a Get step: check, select a version, fetch it, and append it to
/// the pipeline-scoped version log.
pub(crate) async fn run_get<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    get: &GetStep,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let name = get.get.as_str();
    ctx.store.put(path.as_str(), StepPayload::pending()).await?;

    let result = get_body(ctx, scope, get, path, cancel).await;
    match &result {
        Ok(version) => {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(StepStatus::Success).with_version(version.clone()),
                )
                .await?;
        }
        Err(error) => {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(error.status()).with_message(error.to_string()),
                )
                .await?;
        }
    }
    tracing::debug!(resource = name, ok = result.is_ok(), "get finished");
    result.map(|_| ())
}

async fn get_body<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    get: &GetStep,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<Version, EngineError> {
    let name = get.get.as_str();
    let resource = lookup_resource(ctx, name)?;
    let mode = VersionMode::resolve(get.version.as_ref())?;
    let scoped = scoped_name(&ctx.pipeline_id, name);

    let versions = check_versions(ctx, scope, name, resource, path, cancel).await?;
    let version = select_version(ctx, name, &scoped, &mode, &versions).await?;

    fetch_version(
        ctx,
        scope,
        name,
        resource,
        &version,
        get.params.as_ref(),
        &path.nested("in"),
        cancel,
    )
    .await?;

    ctx.store
        .save_resource_version(&scoped, &version, &scope.job)
        .await?;
    Ok(version)
}

/// Execute a Put step: publish through `out`, then implicitly re-fetch the
/// emitted version for output symmetry with Get.
pub(crate) async fn run_put<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    put: &PutStep,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let name = put.put.as_str();
    ctx.store.put(path.as_str(), StepPayload::pending()).await?;

    let result = put_body(ctx, scope, put, path, cancel).await;
    match &result {
        Ok(version) => {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(StepStatus::Success).with_version(version.clone()),
                )
                .await?;
        }
        Err(error) => {
            ctx.store
                .put(
                    path.as_str(),
                    StepPayload::terminal(error.status()).with_message(error.to_string()),
                )
                .await?;
        }
    }
    tracing::debug!(resource = name, ok = result.is_ok(), "put finished");
    result.map(|_| ())
}

async fn put_body<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    put: &PutStep,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<Version, EngineError> {
    let name = put.put.as_str();
    let resource = lookup_resource(ctx, name)?;
    let scoped = scoped_name(&ctx.pipeline_id, name);

    let volume = scope
        .mounts
        .resource(ctx.driver.as_ref(), name)
        .await
        .map_err(|e| errored(name, e))?;

    let version = if let Some(native) = ctx.resources.get(&resource.type_) {
        native
            .push(&resource.source, put.params.as_ref(), &volume.path)
            .await
            .map_err(|e| errored(name, e))?
    } else {
        // Puts see every artifact the job has produced so far.
        let inputs: Vec<IoRef> = scope
            .mounts
            .logical_names()
            .into_iter()
            .map(|name| IoRef { name })
            .collect();
        let config = external_task_config(
            ctx,
            resource,
            "/opt/resource/out",
            vec![format!("./{name}")],
            inputs,
            Vec::new(),
        )?;
        let stdin = json!({"source": resource.source, "params": put.params}).to_string();
        let result = run_protocol_task(
            ctx,
            scope,
            &format!("{name}.out"),
            &config,
            stdin,
            &path.nested("out"),
            cancel,
        )
        .await?;
        parse_emitted_version(name, &result)?
    };

    // The re-fetch observes the version emitted by `out`.
    fetch_version(
        ctx,
        scope,
        name,
        resource,
        &version,
        put.get_params.as_ref(),
        &path.nested("in"),
        cancel,
    )
    .await?;

    ctx.store
        .save_resource_version(&scoped, &version, &scope.job)
        .await?;
    Ok(version)
}

fn lookup_resource<'a, D: Driver, S: Store>(
    ctx: &'a RunContext<D, S>,
    name: &str,
) -> Result<&'a Resource, EngineError> {
    ctx.config
        .resources
        .get(name)
        .ok_or_else(|| EngineError::Resource {
            name: name.to_string(),
            message: "undefined resource".to_string(),
        })
}

async fn check_versions<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    name: &str,
    resource: &Resource,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<Vec<Version>, EngineError> {
    let scoped = scoped_name(&ctx.pipeline_id, name);
    let cursor = ctx
        .store
        .latest_resource_version(&scoped)
        .await?
        .map(|record| record.version);

    if let Some(native) = ctx.resources.get(&resource.type_) {
        return native
            .check(&resource.source, cursor.as_ref())
            .await
            .map_err(|e| errored(name, e));
    }

    let config = external_task_config(
        ctx,
        resource,
        "/opt/resource/check",
        Vec::new(),
        Vec::new(),
        Vec::new(),
    )?;
    let stdin = json!({"source": resource.source, "version": cursor}).to_string();
    let result = run_protocol_task(
        ctx,
        scope,
        &format!("{name}.check"),
        &config,
        stdin,
        &path.nested("check"),
        cancel,
    )
    .await?;

    let parsed: Value = serde_json::from_str(result.stdout.trim()).map_err(|e| {
        errored(name, format!("check emitted invalid JSON: {e}"))
    })?;
    let Value::Array(entries) = parsed else {
        return Err(errored(name, "check must emit an array of versions"));
    };
    entries
        .iter()
        .map(|entry| coerce_version(name, entry))
        .collect()
}

/// Pick the version a Get uses from the check output.
pub(crate) async fn select_version<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    name: &str,
    scoped: &str,
    mode: &VersionMode,
    versions: &[Version],
) -> Result<Version, EngineError> {
    let no_versions = || EngineError::Resource {
        name: name.to_string(),
        message: "no versions returned".to_string(),
    };
    match mode {
        VersionMode::Pinned(pinned) => {
            if versions.iter().any(|candidate| candidate == pinned) {
                Ok(pinned.clone())
            } else {
                Err(EngineError::Resource {
                    name: name.to_string(),
                    message: format!("pinned version not found: {pinned:?}"),
                })
            }
        }
        VersionMode::Latest => versions.last().cloned().ok_or_else(no_versions),
        VersionMode::Every => {
            let seen: Vec<Version> = ctx
                .store
                .list_resource_versions(scoped, 0)
                .await?
                .into_iter()
                .map(|record| record.version)
                .collect();
            versions
                .iter()
                .find(|candidate| !seen.contains(candidate))
                .cloned()
                // All seen: catch up on the newest.
                .or_else(|| versions.last().cloned())
                .ok_or_else(no_versions)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn fetch_version<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    name: &str,
    resource: &Resource,
    version: &Version,
    params: Option<&SourceMap>,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let volume = scope
        .mounts
        .resource(ctx.driver.as_ref(), name)
        .await
        .map_err(|e| errored(name, e))?;

    if let Some(native) = ctx.resources.get(&resource.type_) {
        return native
            .fetch(&resource.source, version, params, &volume.path)
            .await
            .map_err(|e| errored(name, e));
    }

    let config = external_task_config(
        ctx,
        resource,
        "/opt/resource/in",
        vec![format!("./{name}")],
        Vec::new(),
        vec![IoRef {
            name: name.to_string(),
        }],
    )?;
    let stdin = json!({"source": resource.source, "version": version, "params": params}).to_string();
    run_protocol_task(
        ctx,
        scope,
        &format!("{name}.in"),
        &config,
        stdin,
        path,
        cancel,
    )
    .await?;
    Ok(())
}

/// Synthesize the task config for an external resource-type invocation.
fn external_task_config<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    resource: &Resource,
    run_path: &str,
    args: Vec<String>,
    inputs: Vec<IoRef>,
    outputs: Vec<IoRef>,
) -> Result<TaskConfig, EngineError> {
    let type_name = resource.type_.as_str();
    let resource_type =
        ctx.config
            .resource_types
            .get(type_name)
            .ok_or_else(|| EngineError::Resource {
                name: type_name.to_string(),
                message: "resource type has no implementation".to_string(),
            })?;
    let repository = resource_type
        .source
        .get("repository")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Resource {
            name: type_name.to_string(),
            message: "resource type source has no repository".to_string(),
        })?;
    let tag = resource_type
        .source
        .get("tag")
        .and_then(Value::as_str)
        .map(String::from);

    Ok(TaskConfig {
        platform: Platform::Linux,
        image_resource: ImageResource {
            type_: "registry-image".to_string(),
            source: ImageSource {
                repository: repository.to_string(),
                tag,
            },
        },
        run: RunConfig {
            path: run_path.to_string(),
            args,
            user: None,
        },
        inputs,
        outputs,
        caches: Vec::new(),
        env: indexmap::IndexMap::new(),
        container_limits: None,
    })
}

async fn run_protocol_task<D: Driver, S: Store>(
    ctx: &RunContext<D, S>,
    scope: &JobScope,
    name: &str,
    config: &TaskConfig,
    stdin: String,
    path: &StepPath,
    cancel: &CancellationToken,
) -> Result<TaskResult, EngineError> {
    execute_task(
        ctx,
        scope,
        TaskInvocation {
            name,
            config,
            privileged: false,
            limits: None,
            assert: None,
            stdin: Some(stdin),
            timeout: None,
        },
        path,
        cancel,
    )
    .await
}

fn parse_emitted_version(name: &str, result: &TaskResult) -> Result<Version, EngineError> {
    let parsed: Value = serde_json::from_str(result.stdout.trim())
        .map_err(|e| errored(name, format!("out emitted invalid JSON: {e}")))?;
    let version = parsed
        .get("version")
        .ok_or_else(|| errored(name, "out emitted no version"))?;
    coerce_version(name, version)
}

fn coerce_version(name: &str, value: &Value) -> Result<Version, EngineError> {
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k.clone(), s.clone()),
                other => (k.clone(), other.to_string()),
            })
            .collect()),
        Value::String(s) => {
            let mut version = Version::new();
            version.insert("version".to_string(), s.clone());
            Ok(version)
        }
        other => Err(errored(
            name,
            format!("versions must be maps or strings, got {other}"),
        )),
    }
}

fn errored(name: &str, error: impl std::fmt::Display) -> EngineError {
    EngineError::TaskErrored {
        name: name.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
