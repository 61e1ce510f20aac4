// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Four-valued step outcome and the rules for composing child outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a step, job, or pipeline invocation.
///
/// `Failure` is a user task exiting non-zero (or a failed assertion),
/// `Error` an infrastructure fault, `Abort` a termination from outside the
/// task (cancellation or timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failure,
    Error,
    Abort,
}

impl StepStatus {
    /// Composition precedence: `error > abort > failure > success`.
    fn severity(self) -> u8 {
        match self {
            StepStatus::Success => 0,
            StepStatus::Failure => 1,
            StepStatus::Abort => 2,
            StepStatus::Error => 3,
        }
    }

    /// Compose two child outcomes into a group outcome (highest wins).
    pub fn combine(self, other: StepStatus) -> StepStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn is_success(self) -> bool {
        self == StepStatus::Success
    }

    /// The outcome-specific hook slot that fires for this status.
    pub fn hook_slot(self) -> HookSlot {
        match self {
            StepStatus::Success => HookSlot::OnSuccess,
            StepStatus::Failure => HookSlot::OnFailure,
            StepStatus::Error => HookSlot::OnError,
            StepStatus::Abort => HookSlot::OnAbort,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failure => "failure",
            StepStatus::Error => "error",
            StepStatus::Abort => "abort",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook branches a step can carry.
///
/// The matching outcome hook fires first, then `ensure` fires on every
/// terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSlot {
    OnSuccess,
    OnFailure,
    OnError,
    OnAbort,
    Ensure,
}

impl HookSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            HookSlot::OnSuccess => "on_success",
            HookSlot::OnFailure => "on_failure",
            HookSlot::OnError => "on_error",
            HookSlot::OnAbort => "on_abort",
            HookSlot::Ensure => "ensure",
        }
    }
}

impl fmt::Display for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
