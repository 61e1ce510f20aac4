// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Store` capability consumed by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gantry_core::{StepStatus, Version};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payload persisted at a step's storage path.
///
/// Written as `pending` before dispatch and replaced with the terminal
/// record once the step settles; later writes at the same path replace
/// earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPayload {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, rename = "dependsOn", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepPayload {
    pub fn pending() -> Self {
        Self {
            status: "pending".to_string(),
            ..Self::default()
        }
    }

    pub fn terminal(status: StepStatus) -> Self {
        Self {
            status: status.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_output(mut self, stdout: String, stderr: String) -> Self {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = Some(depends_on);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Render to the JSON map stored on disk/memory.
    pub fn to_map(&self) -> Result<Map<String, Value>, StoreError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

/// A record returned from a prefix scan, projected to requested fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub path: String,
    pub fields: Map<String, Value>,
}

/// One entry of a pipeline-scoped resource-version log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceVersionRecord {
    pub scoped_name: String,
    pub version: Version,
    pub job_name: String,
    pub created_at: DateTime<Utc>,
}

/// An entry of the store's pipeline list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence capability the engine writes every intermediate result to.
///
/// Implementations must be safe for concurrent access; the resource-version
/// log is append-only and deduplicated (re-saving an already-logged version
/// is a no-op, which keeps pinned re-runs idempotent).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Idempotent hierarchical write; later writes at `path` replace
    /// earlier ones.
    async fn put(&self, path: &str, payload: StepPayload) -> Result<(), StoreError>;

    /// Every record under `prefix`, projected to `fields`, path-ordered.
    async fn get_all(&self, prefix: &str, fields: &[&str]) -> Result<Vec<StoreRecord>, StoreError>;

    /// Append to the pipeline-scoped version log (no-op for duplicates).
    async fn save_resource_version(
        &self,
        scoped_name: &str,
        version: &Version,
        job_name: &str,
    ) -> Result<(), StoreError>;

    /// Newest entry of the version log, if any.
    async fn latest_resource_version(
        &self,
        scoped_name: &str,
    ) -> Result<Option<ResourceVersionRecord>, StoreError>;

    /// Version log, newest first; `limit == 0` means no limit.
    async fn list_resource_versions(
        &self,
        scoped_name: &str,
        limit: usize,
    ) -> Result<Vec<ResourceVersionRecord>, StoreError>;

    /// Record a pipeline in the store's pipeline list, idempotent by name.
    async fn save_pipeline(&self, name: &str, path: &str) -> Result<(), StoreError>;

    /// All known pipelines in registration order.
    async fn list_pipelines(&self) -> Result<Vec<PipelineEntry>, StoreError>;
}
