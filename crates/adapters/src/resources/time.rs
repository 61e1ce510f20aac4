// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time resource: versions are interval-quantized timestamps.
//!
//! Source schema: `interval` (duration string, default `"1m"`). Each check
//! yields a single version for the current bucket, so a Get in `every` mode
//! sees one new version per elapsed interval.

use super::{NativeResource, ResourceError};
use async_trait::async_trait;
use gantry_core::{parse_duration, SourceMap, Version};
use serde_json::Value;
use std::path::Path;

const DEFAULT_INTERVAL: u64 = 60;

#[derive(Clone, Copy, Debug, Default)]
pub struct TimeResource;

impl TimeResource {
    pub fn new() -> Self {
        Self
    }
}

fn interval_secs(source: &SourceMap) -> Result<u64, ResourceError> {
    match source.get("interval") {
        None => Ok(DEFAULT_INTERVAL),
        Some(Value::String(s)) => {
            let duration = parse_duration(s)
                .map_err(|e| ResourceError::InvalidSource(e.to_string()))?;
            Ok(duration.as_secs().max(1))
        }
        Some(other) => Err(ResourceError::InvalidSource(format!(
            "interval must be a duration string, got {other}"
        ))),
    }
}

fn bucket_version(source: &SourceMap) -> Result<Version, ResourceError> {
    let interval = interval_secs(source)?;
    let now = chrono::Utc::now().timestamp() as u64;
    let bucket = now - now % interval;
    let mut version = Version::new();
    version.insert("time".to_string(), bucket.to_string());
    Ok(version)
}

#[async_trait]
impl NativeResource for TimeResource {
    async fn check(
        &self,
        source: &SourceMap,
        _cursor: Option<&Version>,
    ) -> Result<Vec<Version>, ResourceError> {
        Ok(vec![bucket_version(source)?])
    }

    async fn fetch(
        &self,
        _source: &SourceMap,
        version: &Version,
        _params: Option<&SourceMap>,
        dest: &Path,
    ) -> Result<(), ResourceError> {
        let stamp = version.get("time").cloned().unwrap_or_default();
        tokio::fs::write(dest.join("input"), stamp).await?;
        Ok(())
    }

    async fn push(
        &self,
        _source: &SourceMap,
        _params: Option<&SourceMap>,
        _src: &Path,
    ) -> Result<Version, ResourceError> {
        Err(ResourceError::PushUnsupported("time".to_string()))
    }
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
