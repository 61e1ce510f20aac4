// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized pipeline configuration consumed by the engine.

use crate::step::Step;
use crate::version::SourceMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Resource type implicitly defined in every pipeline.
pub const BUILTIN_RESOURCE_TYPE: &str = "registry-image";

/// A named external versioned thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub source: SourceMap,
}

/// The executable implementing check/in/out for a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub source: SourceMap,
}

/// Expected execution order assertion on a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAssert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<Vec<String>>,
}

/// Expected execution order assertion on a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineAssert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<Vec<String>>,
}

/// An ordered execution plan with lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub plan: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_abort: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<JobAssert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Job {
    /// Union of all `passed` constraints in this job's plan (hooks
    /// included), deduplicated in first-reference order.
    pub fn depends_on(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let mut visit = |step: &Step| {
            if let Step::Get(get) = step {
                for name in &get.passed {
                    if !seen.contains(name) {
                        seen.push(name.clone());
                    }
                }
            }
        };
        for step in &self.plan {
            step.walk(&mut visit);
        }
        for hook in [
            &self.on_success,
            &self.on_failure,
            &self.on_error,
            &self.on_abort,
            &self.ensure,
        ]
        .into_iter()
        .flatten()
        {
            hook.walk(&mut visit);
        }
        seen
    }
}

/// The normalized, validated pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub jobs: Vec<Job>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Resource>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resource_types: IndexMap<String, ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<PipelineAssert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl PipelineConfig {
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Whether `name` resolves to a defined resource type, counting the
    /// built-in `registry-image`.
    pub fn has_resource_type(&self, name: &str) -> bool {
        name == BUILTIN_RESOURCE_TYPE || self.resource_types.contains_key(name)
    }
}
