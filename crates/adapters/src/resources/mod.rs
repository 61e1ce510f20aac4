// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native resource implementations: check/fetch/push handled in-process
//! instead of through a resource-type image.

mod mock;
mod registry_image;
mod time;

pub use mock::MockResource;
pub use registry_image::RegistryImageResource;
pub use time::TimeResource;

use async_trait::async_trait;
use gantry_core::{SourceMap, Version};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from native resource operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid source configuration: {0}")]
    InvalidSource(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("push is not supported by the {0} resource")]
    PushUnsupported(String),
}

/// An in-process implementation of a resource type.
#[async_trait]
pub trait NativeResource: Send + Sync + 'static {
    /// Produce the versions list, oldest first. `cursor` is the newest
    /// version already known, when there is one.
    async fn check(
        &self,
        source: &SourceMap,
        cursor: Option<&Version>,
    ) -> Result<Vec<Version>, ResourceError>;

    /// Materialize `version` into `dest`.
    async fn fetch(
        &self,
        source: &SourceMap,
        version: &Version,
        params: Option<&SourceMap>,
        dest: &Path,
    ) -> Result<(), ResourceError>;

    /// Publish from `src`, returning the created version.
    async fn push(
        &self,
        source: &SourceMap,
        params: Option<&SourceMap>,
        src: &Path,
    ) -> Result<Version, ResourceError>;
}

/// Registry of native resource types, keyed by type name.
///
/// Constructed per pipeline invocation; cheap to clone.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    natives: HashMap<String, Arc<dyn NativeResource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in natives (`mock`, `time`, and the
    /// implicitly defined `registry-image`).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert("mock", MockResource::new());
        registry.insert("time", TimeResource::new());
        registry.insert("registry-image", RegistryImageResource::new());
        registry
    }

    pub fn insert(&mut self, type_name: impl Into<String>, resource: impl NativeResource) {
        self.natives.insert(type_name.into(), Arc::new(resource));
    }

    pub fn is_native(&self, type_name: &str) -> bool {
        self.natives.contains_key(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn NativeResource>> {
        self.natives.get(type_name).cloned()
    }

    /// Names of the registered native types, for validation allowlists.
    pub fn type_names(&self) -> Vec<String> {
        self.natives.keys().cloned().collect()
    }
}
