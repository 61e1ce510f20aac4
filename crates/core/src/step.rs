// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step tree: a tagged variant per composable form.
//!
//! Exactly one form tag (`task`, `get`, `put`, `do`, `try`, `in_parallel`,
//! `notify`) is present per node; the common fields (hooks, timeout,
//! attempts, across, assert) ride alongside on every form.

use crate::status::HookSlot;
use crate::task::{ContainerLimits, TaskConfig};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields shared by every step form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Box<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Box<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<Box<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_abort: Option<Box<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Box<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub across: Vec<AcrossVar>,
    /// Fail-fast for the across expansion; `in_parallel` carries its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<StepAssert>,
}

impl StepCommon {
    /// The hook step attached to a slot, if any.
    pub fn hook(&self, slot: HookSlot) -> Option<&Step> {
        match slot {
            HookSlot::OnSuccess => self.on_success.as_deref(),
            HookSlot::OnFailure => self.on_failure.as_deref(),
            HookSlot::OnError => self.on_error.as_deref(),
            HookSlot::OnAbort => self.on_abort.as_deref(),
            HookSlot::Ensure => self.ensure.as_deref(),
        }
    }
}

/// One variable of an across expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrossVar {
    pub var: String,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,
}

/// Expected output of a step, checked after a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepAssert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl StepAssert {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none() && self.code.is_none()
    }
}

/// Raw `version` field of a Get step; resolved via
/// [`crate::version::VersionMode::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionSpec {
    Mode(String),
    Pinned(Version),
}

/// One or many notification channel names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Channels {
    One(String),
    Many(Vec<String>),
}

impl Channels {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Channels::One(name) => vec![name.as_str()],
            Channels::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Joined form used in step identifiers.
    pub fn joined(&self) -> String {
        self.names().join(",")
    }
}

/// Leaf work: run a command inside an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TaskConfig>,
    /// Load the task config from a file inside a mounted input instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_limits: Option<ContainerLimits>,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Fetch a resource version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetStep {
    pub get: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionSpec>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trigger: bool,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Publish a resource version, then implicitly re-fetch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutStep {
    pub put: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_params: Option<serde_json::Map<String, Value>>,
    /// Declared but unsupported; rejected at validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_get: Option<bool>,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Sequential composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoStep {
    #[serde(rename = "do")]
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Composition that swallows failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStep {
    #[serde(rename = "try")]
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Concurrent composition settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InParallelConfig {
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fail_fast: bool,
}

/// Concurrent composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InParallelStep {
    pub in_parallel: InParallelConfig,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// Out-of-band notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyStep {
    pub notify: Channels,
    pub message: String,
    #[serde(default, rename = "async", skip_serializing_if = "std::ops::Not::not")]
    pub fire_and_forget: bool,
    #[serde(flatten)]
    pub common: StepCommon,
}

/// A node in a job's plan tree. The form tag is immutable after
/// construction; untagged deserialization picks the variant whose tag field
/// is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Task(TaskStep),
    Get(GetStep),
    Put(PutStep),
    Do(DoStep),
    Try(TryStep),
    InParallel(InParallelStep),
    Notify(NotifyStep),
}

impl Step {
    /// Identifier used in storage paths: `tasks/<name>`, `get/<name>`,
    /// `put/<name>`, `do`, `try`, `in_parallel`, `notify/<name(s)>`.
    pub fn id(&self) -> String {
        match self {
            Step::Task(s) => format!("tasks/{}", s.task),
            Step::Get(s) => format!("get/{}", s.get),
            Step::Put(s) => format!("put/{}", s.put),
            Step::Do(_) => "do".to_string(),
            Step::Try(_) => "try".to_string(),
            Step::InParallel(_) => "in_parallel".to_string(),
            Step::Notify(s) => format!("notify/{}", s.notify.joined()),
        }
    }

    /// Human-readable name used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            Step::Task(s) => s.task.clone(),
            Step::Get(s) => format!("get {}", s.get),
            Step::Put(s) => format!("put {}", s.put),
            Step::Do(_) => "do".to_string(),
            Step::Try(_) => "try".to_string(),
            Step::InParallel(_) => "in_parallel".to_string(),
            Step::Notify(s) => format!("notify {}", s.notify.joined()),
        }
    }

    pub fn common(&self) -> &StepCommon {
        match self {
            Step::Task(s) => &s.common,
            Step::Get(s) => &s.common,
            Step::Put(s) => &s.common,
            Step::Do(s) => &s.common,
            Step::Try(s) => &s.common,
            Step::InParallel(s) => &s.common,
            Step::Notify(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut StepCommon {
        match self {
            Step::Task(s) => &mut s.common,
            Step::Get(s) => &mut s.common,
            Step::Put(s) => &mut s.common,
            Step::Do(s) => &mut s.common,
            Step::Try(s) => &mut s.common,
            Step::InParallel(s) => &mut s.common,
            Step::Notify(s) => &mut s.common,
        }
    }

    /// Direct children of this node (composition members only, not hooks).
    pub fn children(&self) -> &[Step] {
        match self {
            Step::Do(s) => &s.steps,
            Step::Try(s) => &s.steps,
            Step::InParallel(s) => &s.in_parallel.steps,
            _ => &[],
        }
    }

    /// Visit this node, its children, and its hooks, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Step)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
        let common = self.common();
        for hook in [
            &common.on_success,
            &common.on_failure,
            &common.on_error,
            &common.on_abort,
            &common.ensure,
        ]
        .into_iter()
        .flatten()
        {
            hook.walk(visit);
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
