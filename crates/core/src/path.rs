// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical storage paths for step instances.
//!
//! Every step invocation writes its progress under a deterministic key of
//! the form `/pipeline/{run}/jobs/{job}/{index}/{step id}/...`; hooks and
//! across iterations extend the parent key.

use crate::id::RunId;
use crate::status::HookSlot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A storage key for one step instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPath(String);

impl StepPath {
    /// Root key for a pipeline invocation: `/pipeline/{run}`.
    pub fn pipeline_root(run_id: &RunId) -> Self {
        Self(format!("/pipeline/{}", run_id))
    }

    /// Key for a job: `/pipeline/{run}/jobs/{name}`.
    pub fn job_root(run_id: &RunId, job: &str) -> Self {
        Self(format!("/pipeline/{}/jobs/{}", run_id, job))
    }

    /// Key for the `index`-th child step, zero-padded over siblings.
    pub fn child(&self, index: usize, step_id: &str) -> Self {
        Self(format!("{}/{:02}/{}", self.0, index, step_id))
    }

    /// Key for a hook invocation on this step.
    pub fn hook(&self, slot: HookSlot) -> Self {
        Self(format!("{}/{}", self.0, slot))
    }

    /// Key for one across combination: `/across/{i}_{var}_{val}_...`.
    ///
    /// Bindings appear in declaration order so the key is deterministic.
    pub fn across(&self, index: usize, bindings: &[(String, String)]) -> Self {
        let mut suffix = String::new();
        for (var, val) in bindings {
            suffix.push('_');
            suffix.push_str(var);
            suffix.push('_');
            suffix.push_str(val);
        }
        Self(format!("{}/across/{}{}", self.0, index, suffix))
    }

    /// Key for a nested record under this step (e.g. a synthesized resource
    /// task: `check`, `in`, `out`).
    pub fn nested(&self, segment: &str) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the stable volume name for a task cache path.
///
/// Cache volumes are keyed by `cache-<sanitized path>` so they survive
/// across pipeline runs when the driver supports named volumes.
pub fn sanitize_cache_name(path: &str) -> String {
    let sanitized: String = path
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("cache-{}", sanitized)
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
