// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry-image resource: the implicitly defined resource type.
//!
//! The native driver runs tasks as host subprocesses, so an image is an
//! identity rather than a filesystem to pull. Versions carry the reference
//! from `source` (`repository`, optional `tag`, default `latest`); fetch
//! materializes `repository`, `tag`, and `image` files the way downstream
//! tasks expect from an image resource.

use super::{NativeResource, ResourceError};
use async_trait::async_trait;
use gantry_core::{SourceMap, Version};
use serde_json::Value;
use std::path::Path;

const DEFAULT_TAG: &str = "latest";

#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryImageResource;

impl RegistryImageResource {
    pub fn new() -> Self {
        Self
    }
}

fn reference(source: &SourceMap) -> Result<(String, String), ResourceError> {
    let repository = source
        .get("repository")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ResourceError::InvalidSource("registry-image requires a repository".to_string())
        })?;
    let tag = source
        .get("tag")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TAG);
    Ok((repository.to_string(), tag.to_string()))
}

#[async_trait]
impl NativeResource for RegistryImageResource {
    async fn check(
        &self,
        source: &SourceMap,
        _cursor: Option<&Version>,
    ) -> Result<Vec<Version>, ResourceError> {
        let (repository, tag) = reference(source)?;
        let mut version = Version::new();
        version.insert("ref".to_string(), format!("{repository}:{tag}"));
        Ok(vec![version])
    }

    async fn fetch(
        &self,
        source: &SourceMap,
        version: &Version,
        _params: Option<&SourceMap>,
        dest: &Path,
    ) -> Result<(), ResourceError> {
        let (repository, tag) = reference(source)?;
        let image = version
            .get("ref")
            .cloned()
            .unwrap_or_else(|| format!("{repository}:{tag}"));
        tokio::fs::write(dest.join("repository"), &repository).await?;
        tokio::fs::write(dest.join("tag"), &tag).await?;
        tokio::fs::write(dest.join("image"), image).await?;
        Ok(())
    }

    async fn push(
        &self,
        _source: &SourceMap,
        _params: Option<&SourceMap>,
        _src: &Path,
    ) -> Result<Version, ResourceError> {
        Err(ResourceError::PushUnsupported("registry-image".to_string()))
    }
}

#[cfg(test)]
#[path = "registry_image_tests.rs"]
mod tests;
