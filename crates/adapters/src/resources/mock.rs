// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mock resource: versions and file payloads declared in `source`.
//!
//! Source schema:
//! - `versions`: array of version maps (or bare strings, shorthand for
//!   `{"version": s}`), oldest first.
//! - `files`: optional map of file name to content, written on fetch.

use super::{NativeResource, ResourceError};
use async_trait::async_trait;
use gantry_core::{SourceMap, Version};
use serde_json::Value;
use std::path::Path;

/// File a fetched version is serialized into.
const VERSION_FILE: &str = "version.json";

#[derive(Clone, Copy, Debug, Default)]
pub struct MockResource;

impl MockResource {
    pub fn new() -> Self {
        Self
    }
}

fn parse_version(value: &Value) -> Result<Version, ResourceError> {
    match value {
        Value::String(s) => {
            let mut version = Version::new();
            version.insert("version".to_string(), s.clone());
            Ok(version)
        }
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Ok((k.clone(), other.to_string())),
            })
            .collect(),
        other => Err(ResourceError::InvalidSource(format!(
            "version entries must be strings or maps, got {other}"
        ))),
    }
}

#[async_trait]
impl NativeResource for MockResource {
    async fn check(
        &self,
        source: &SourceMap,
        _cursor: Option<&Version>,
    ) -> Result<Vec<Version>, ResourceError> {
        let Some(versions) = source.get("versions") else {
            return Ok(Vec::new());
        };
        let Value::Array(entries) = versions else {
            return Err(ResourceError::InvalidSource(
                "versions must be an array".to_string(),
            ));
        };
        entries.iter().map(parse_version).collect()
    }

    async fn fetch(
        &self,
        source: &SourceMap,
        version: &Version,
        _params: Option<&SourceMap>,
        dest: &Path,
    ) -> Result<(), ResourceError> {
        let rendered = serde_json::to_string(version)
            .map_err(|e| ResourceError::InvalidSource(e.to_string()))?;
        tokio::fs::write(dest.join(VERSION_FILE), rendered).await?;

        if let Some(Value::Object(files)) = source.get("files") {
            for (name, content) in files {
                let content = match content {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tokio::fs::write(dest.join(name), content).await?;
            }
        }
        Ok(())
    }

    async fn push(
        &self,
        _source: &SourceMap,
        params: Option<&SourceMap>,
        _src: &Path,
    ) -> Result<Version, ResourceError> {
        let value = params
            .and_then(|params| params.get("version"))
            .ok_or_else(|| {
                ResourceError::InvalidParams("push requires a version param".to_string())
            })?;
        parse_version(value)
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
