// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration invariants, checked before any execution.

use crate::pipeline::{Job, PipelineConfig};
use crate::step::Step;
use crate::version::VersionMode;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A pipeline definition that violates the configuration invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("pipeline must define at least one job")]
    NoJobs,
    #[error("job name must not be empty")]
    EmptyJobName,
    #[error("duplicate job name: {name}")]
    DuplicateJob { name: String },
    #[error("job {job} has an empty plan")]
    EmptyPlan { job: String },
    #[error("job {job} references unknown resource: {resource}")]
    UnknownResource { job: String, resource: String },
    #[error("resource {resource} references unknown resource type: {type_}")]
    UnknownResourceType { resource: String, type_: String },
    #[error("job {job} passed constraint references unknown job: {reference}")]
    UnknownPassedJob { job: String, reference: String },
    #[error("task {task} image references unknown resource type: {type_}")]
    UnknownImageType { task: String, type_: String },
    #[error("step attempts must be at least 1 in job {job}")]
    ZeroAttempts { job: String },
    #[error("unknown version mode: {mode}")]
    UnknownVersionMode { mode: String },
    #[error("invalid duration: {value}")]
    InvalidDuration { value: String },
    #[error("put {resource} sets no_get, which is not supported")]
    NoGetUnsupported { resource: String },
    #[error("job dependency cycle: {cycle}")]
    DependencyCycle { cycle: String },
}

/// Validate a normalized pipeline against the configuration invariants.
///
/// Only declared resource types and the built-in `registry-image` are
/// recognized; callers whose engine carries native (in-process) resource
/// types should use [`validate_with_types`] instead.
pub fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    validate_with_types(config, &[])
}

/// Validate with additional resource type names the engine implements
/// in-process (native types are intentionally never declared in
/// `resource_types`).
///
/// Returns the first violation found. The job dependency graph is checked
/// for cycles by DFS with a recursion stack; a cyclic graph is rejected
/// before any job runs.
pub fn validate_with_types(
    config: &PipelineConfig,
    native_types: &[&str],
) -> Result<(), ConfigError> {
    if config.jobs.is_empty() {
        return Err(ConfigError::NoJobs);
    }

    let mut names = HashSet::new();
    for job in &config.jobs {
        if job.name.is_empty() {
            return Err(ConfigError::EmptyJobName);
        }
        if !names.insert(job.name.as_str()) {
            return Err(ConfigError::DuplicateJob {
                name: job.name.clone(),
            });
        }
        if job.plan.is_empty() {
            return Err(ConfigError::EmptyPlan {
                job: job.name.clone(),
            });
        }
    }

    let known_type =
        |name: &str| config.has_resource_type(name) || native_types.contains(&name);

    for (name, resource) in &config.resources {
        if !known_type(&resource.type_) {
            return Err(ConfigError::UnknownResourceType {
                resource: name.clone(),
                type_: resource.type_.clone(),
            });
        }
    }

    for job in &config.jobs {
        validate_job_steps(config, &known_type, job)?;
    }

    detect_cycles(config)?;
    Ok(())
}

fn validate_job_steps(
    config: &PipelineConfig,
    known_type: &impl Fn(&str) -> bool,
    job: &Job,
) -> Result<(), ConfigError> {
    let mut violation = None;
    let mut visit = |step: &Step| {
        if violation.is_some() {
            return;
        }
        violation = check_step(config, known_type, job, step).err();
    };
    for step in &job.plan {
        step.walk(&mut visit);
    }
    for hook in [
        &job.on_success,
        &job.on_failure,
        &job.on_error,
        &job.on_abort,
        &job.ensure,
    ]
    .into_iter()
    .flatten()
    {
        hook.walk(&mut visit);
    }
    match violation {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_step(
    config: &PipelineConfig,
    known_type: &impl Fn(&str) -> bool,
    job: &Job,
    step: &Step,
) -> Result<(), ConfigError> {
    if step.common().attempts == Some(0) {
        return Err(ConfigError::ZeroAttempts {
            job: job.name.clone(),
        });
    }
    if let Some(timeout) = &step.common().timeout {
        crate::duration::parse_duration(timeout)?;
    }
    match step {
        Step::Get(get) => {
            if !config.resources.contains_key(&get.get) {
                return Err(ConfigError::UnknownResource {
                    job: job.name.clone(),
                    resource: get.get.clone(),
                });
            }
            for reference in &get.passed {
                if config.job(reference).is_none() {
                    return Err(ConfigError::UnknownPassedJob {
                        job: job.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            VersionMode::resolve(get.version.as_ref())?;
        }
        Step::Put(put) => {
            if !config.resources.contains_key(&put.put) {
                return Err(ConfigError::UnknownResource {
                    job: job.name.clone(),
                    resource: put.put.clone(),
                });
            }
            if put.no_get == Some(true) {
                return Err(ConfigError::NoGetUnsupported {
                    resource: put.put.clone(),
                });
            }
        }
        Step::Task(task) => {
            if let Some(task_config) = &task.config {
                let type_ = &task_config.image_resource.type_;
                if !known_type(type_) {
                    return Err(ConfigError::UnknownImageType {
                        task: task.task.clone(),
                        type_: type_.clone(),
                    });
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// DFS with an explicit recursion stack over the `passed` edges
/// (dependency → dependent is reversed here: we walk dependencies).
fn detect_cycles(config: &PipelineConfig) -> Result<(), ConfigError> {
    let deps: HashMap<&str, Vec<String>> = config
        .jobs
        .iter()
        .map(|job| (job.name.as_str(), job.depends_on()))
        .collect();

    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    for job in &config.jobs {
        walk_deps(job.name.as_str(), &deps, &mut visited, &mut stack)?;
    }
    Ok(())
}

fn walk_deps(
    name: &str,
    deps: &HashMap<&str, Vec<String>>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> Result<(), ConfigError> {
    if stack.iter().any(|entry| entry == name) {
        let mut cycle: Vec<String> = stack.clone();
        cycle.push(name.to_string());
        return Err(ConfigError::DependencyCycle {
            cycle: cycle.join(" -> "),
        });
    }
    if visited.contains(name) {
        return Ok(());
    }
    stack.push(name.to_string());
    if let Some(dependencies) = deps.get(name) {
        for dependency in dependencies {
            walk_deps(dependency, deps, visited, stack)?;
        }
    }
    stack.pop();
    visited.insert(name.to_string());
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
