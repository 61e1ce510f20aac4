// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native driver: runs tasks as host subprocesses.
//!
//! Volumes are directories under the driver's namespace root; mounts become
//! symlinks inside a per-run scratch directory, which is also the task's
//! working directory. The `image` of a spec is ignored: there is no
//! container here, only fork/exec.

use super::{Driver, DriverError, RunOutput, RunSpec, RunStatus, Volume};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Subprocess driver rooted at a base directory.
pub struct NativeDriver {
    root: PathBuf,
    namespace: String,
}

impl NativeDriver {
    /// Create a driver rooted at `root`, isolated under `namespace`.
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespace: namespace.into(),
        }
    }

    fn volumes_dir(&self) -> PathBuf {
        self.root.join("volumes").join(&self.namespace)
    }

    fn runs_dir(&self) -> PathBuf {
        self.root.join("runs").join(&self.namespace)
    }

    async fn prepare_run_dir(&self, spec: &RunSpec) -> Result<PathBuf, DriverError> {
        let run_dir = self.runs_dir().join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&run_dir).await?;

        for mount in &spec.mounts {
            let at = mount.at.trim_start_matches('/');
            let target = run_dir.join(at);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            link_volume(&mount.volume.path, &target).await?;
        }
        Ok(run_dir)
    }
}

#[cfg(unix)]
async fn link_volume(volume: &Path, target: &Path) -> Result<(), DriverError> {
    tokio::fs::symlink(volume, target).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn link_volume(_volume: &Path, target: &Path) -> Result<(), DriverError> {
    Err(DriverError::Unsupported(format!(
        "volume mounts require symlinks: {}",
        target.display()
    )))
}

#[async_trait]
impl Driver for NativeDriver {
    async fn run(
        &self,
        spec: RunSpec,
        cancel: CancellationToken,
    ) -> Result<RunOutput, DriverError> {
        let run_dir = self.prepare_run_dir(&spec).await?;

        tracing::info!(
            task = %spec.name,
            command = %spec.command.path,
            cwd = %run_dir.display(),
            "running task",
        );

        let mut command = Command::new(&spec.command.path);
        command
            .args(&spec.command.args)
            .envs(spec.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .current_dir(&run_dir)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| DriverError::Spawn {
            command: spec.command.path.clone(),
            message: e.to_string(),
        })?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                // Dropping closes the pipe so the child sees EOF.
            }
        }

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        let timeout = spec.timeout;
        let aborted: Option<&'static str> = tokio::select! {
            status = child.wait() => {
                let status = status?;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                let code = status.code().map(i64::from).unwrap_or(-1);
                return Ok(RunOutput {
                    code,
                    stdout,
                    stderr,
                    status: RunStatus::Complete,
                    message: None,
                });
            }
            _ = cancel.cancelled() => Some("cancelled"),
            _ = sleep_or_forever(timeout) => Some("timed out"),
        };

        // Abort path: kill the child, then reap it.
        let reason = aborted.unwrap_or("aborted");
        tracing::warn!(task = %spec.name, reason, "aborting task");
        let _ = child.kill().await;
        let code = child
            .wait()
            .await
            .ok()
            .and_then(|status| status.code())
            .map(i64::from)
            .unwrap_or(-1);
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        Ok(RunOutput {
            code,
            stdout,
            stderr,
            status: RunStatus::Abort,
            message: Some(reason.to_string()),
        })
    }

    async fn create_volume(&self, name: Option<&str>) -> Result<Volume, DriverError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("vol-{}", uuid::Uuid::new_v4()),
        };
        let path = self.volumes_dir().join(&name);
        tokio::fs::create_dir_all(&path).await?;
        Ok(Volume { name, path })
    }

    async fn close(&self) -> Result<(), DriverError> {
        let runs = self.runs_dir();
        if runs.exists() {
            tokio::fs::remove_dir_all(&runs).await?;
        }
        Ok(())
    }
}

async fn sleep_or_forever(timeout: Option<std::time::Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
