// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-core: normalized pipeline model and shared primitives for the
//! Gantry CI engine.

pub mod duration;
pub mod id;
pub mod path;
pub mod pipeline;
pub mod status;
pub mod step;
pub mod task;
pub mod validate;
pub mod version;

pub use duration::parse_duration;
pub use id::{scoped_name, PipelineId, RunId};
pub use path::{sanitize_cache_name, StepPath};
pub use pipeline::{Job, JobAssert, PipelineAssert, PipelineConfig, Resource, ResourceType};
pub use status::{HookSlot, StepStatus};
pub use step::{
    AcrossVar, Channels, DoStep, GetStep, InParallelConfig, InParallelStep, NotifyStep, PutStep,
    Step, StepAssert, StepCommon, TaskStep, TryStep, VersionSpec,
};
pub use task::{CacheRef, ContainerLimits, ImageResource, IoRef, Platform, RunConfig, TaskConfig};
pub use validate::{validate, validate_with_types, ConfigError};
pub use version::{SourceMap, Version, VersionMode};
