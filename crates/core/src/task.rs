// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task configuration: the leaf unit of work handed to a driver.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Execution platform a task declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

/// The image a task runs in, expressed as a resource definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "type")]
    pub type_: String,
    pub source: ImageSource,
}

/// Source configuration for an image resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ImageResource {
    /// Render the image reference handed to the driver.
    pub fn image_ref(&self) -> String {
        match &self.source.tag {
            Some(tag) => format!("{}:{}", self.source.repository, tag),
            None => self.source.repository.clone(),
        }
    }
}

/// The command a task executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A named input or output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoRef {
    pub name: String,
}

/// A cache location inside the task container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRef {
    pub path: String,
}

/// Resource limits applied to the task container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

/// A complete task configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub platform: Platform,
    pub image_resource: ImageResource,
    pub run: RunConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<IoRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<IoRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caches: Vec<CacheRef>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_limits: Option<ContainerLimits>,
}
