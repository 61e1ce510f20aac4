// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Driver, notification, and native-resource adapters for the Gantry engine.

pub mod driver;
pub mod notify;
pub mod resources;

pub use driver::{
    Driver, DriverError, Mount, NativeDriver, RunCommand, RunOutput, RunSpec, RunStatus, Volume,
};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError, NotifyRegistry};
pub use resources::{
    MockResource, NativeResource, RegistryImageResource, ResourceError, ResourceRegistry,
    TimeResource,
};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
