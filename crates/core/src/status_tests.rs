// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    success_failure = { StepStatus::Success, StepStatus::Failure, StepStatus::Failure },
    failure_success = { StepStatus::Failure, StepStatus::Success, StepStatus::Failure },
    failure_abort = { StepStatus::Failure, StepStatus::Abort, StepStatus::Abort },
    abort_error = { StepStatus::Abort, StepStatus::Error, StepStatus::Error },
    error_abort = { StepStatus::Error, StepStatus::Abort, StepStatus::Error },
    success_success = { StepStatus::Success, StepStatus::Success, StepStatus::Success },
)]
fn combine_takes_highest_severity(a: StepStatus, b: StepStatus, expected: StepStatus) {
    assert_eq!(a.combine(b), expected);
}

#[test]
fn combine_is_commutative() {
    let all = [
        StepStatus::Success,
        StepStatus::Failure,
        StepStatus::Error,
        StepStatus::Abort,
    ];
    for a in all {
        for b in all {
            assert_eq!(a.combine(b), b.combine(a));
        }
    }
}

#[test]
fn hook_slot_matches_status() {
    assert_eq!(StepStatus::Success.hook_slot(), HookSlot::OnSuccess);
    assert_eq!(StepStatus::Failure.hook_slot(), HookSlot::OnFailure);
    assert_eq!(StepStatus::Error.hook_slot(), HookSlot::OnError);
    assert_eq!(StepStatus::Abort.hook_slot(), HookSlot::OnAbort);
}

#[test]
fn status_serializes_lowercase() {
    let json = serde_json::to_string(&StepStatus::Failure).unwrap();
    assert_eq!(json, "\"failure\"");
    let back: StepStatus = serde_json::from_str("\"abort\"").unwrap();
    assert_eq!(back, StepStatus::Abort);
}
