// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container/process driver capability the engine runs tasks against.

mod native;

pub use native::NativeDriver;

use async_trait::async_trait;
use gantry_core::ContainerLimits;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Infrastructure faults, distinct from a task exiting non-zero.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },
    #[error("unsupported on this platform: {0}")]
    Unsupported(String),
}

/// A storage volume a task can mount.
///
/// Named volumes are stable across runs when the driver supports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub path: PathBuf,
}

/// A volume mounted at a path inside the task's working tree.
#[derive(Debug, Clone)]
pub struct Mount {
    pub volume: Volume,
    pub at: String,
}

/// The command a task runs.
#[derive(Debug, Clone, Default)]
pub struct RunCommand {
    pub path: String,
    pub args: Vec<String>,
    pub user: Option<String>,
}

/// Everything a driver needs to run one task.
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub name: String,
    pub image: Option<String>,
    pub command: RunCommand,
    pub env: IndexMap<String, String>,
    pub mounts: Vec<Mount>,
    pub privileged: bool,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
    pub limits: Option<ContainerLimits>,
}

/// How a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The process ran to completion (its exit code may still be non-zero).
    Complete,
    /// The process was terminated by cancellation or timeout.
    Abort,
}

/// Result of a driver run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i64,
    pub stdout: String,
    pub stderr: String,
    pub status: RunStatus,
    pub message: Option<String>,
}

/// Capability set the engine consumes to execute tasks.
///
/// Implementations receive a namespace string (derived from the pipeline ID)
/// at construction for isolation.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Run a task to termination, honouring `cancel` and `spec.timeout`.
    async fn run(&self, spec: RunSpec, cancel: CancellationToken)
        -> Result<RunOutput, DriverError>;

    /// Create a volume; anonymous when `name` is `None`.
    async fn create_volume(&self, name: Option<&str>) -> Result<Volume, DriverError>;

    /// Release per-run state. Named volumes survive close.
    async fn close(&self) -> Result<(), DriverError>;
}
