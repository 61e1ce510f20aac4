// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! The interpreter catches exactly these kinds at each level to select the
//! correct hook; anything else is surfaced as a task error.

use gantry_core::{ConfigError, StepStatus};
use gantry_storage::StoreError;
use thiserror::Error;

/// Errors produced while executing a pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// User task exited non-zero.
    #[error("Task {name} failed with code {code}")]
    TaskFailed { name: String, code: i64 },
    /// A step or execution assertion did not hold.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),
    /// Infrastructure fault: driver raised, IO failed, native resource
    /// errored.
    #[error("Task {name} errored: {message}")]
    TaskErrored { name: String, message: String },
    /// Task terminated by cancellation or timeout.
    #[error("Task {name} aborted")]
    TaskAborted { name: String },
    /// Pipeline config violates an invariant; raised before execution.
    #[error("validation failed: {0}")]
    Validation(#[from] ConfigError),
    /// No versions returned, pinned version not found, or a resource
    /// protocol violation.
    #[error("resource {name}: {message}")]
    Resource { name: String, message: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Classify into the status algebra.
    pub fn status(&self) -> StepStatus {
        match self {
            EngineError::TaskFailed { .. } | EngineError::AssertionFailed(_) => StepStatus::Failure,
            EngineError::TaskAborted { .. } => StepStatus::Abort,
            _ => StepStatus::Error,
        }
    }
}

/// Status of a settled step result.
pub(crate) fn status_of(result: &Result<(), EngineError>) -> StepStatus {
    match result {
        Ok(()) => StepStatus::Success,
        Err(error) => error.status(),
    }
}

/// Merge a body outcome with a hook outcome.
///
/// The higher-severity error wins; on a tie the hook's error is reported
/// (its message is the fresher diagnosis), though the body's status stays
/// the one recorded for the step.
pub(crate) fn merge_errors(
    body: Option<EngineError>,
    hook: Option<EngineError>,
) -> Option<EngineError> {
    match (body, hook) {
        (None, hook) => hook,
        (body, None) => body,
        (Some(body), Some(hook)) => {
            if hook.status().combine(body.status()) == hook.status() {
                Some(hook)
            } else {
                Some(body)
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
