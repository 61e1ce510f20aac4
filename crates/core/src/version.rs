// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource version values and version-mode resolution.

use crate::step::VersionSpec;
use crate::validate::ConfigError;
use std::collections::BTreeMap;

/// A resource version: an ordered map of key/value pairs as emitted by the
/// resource's `check` implementation.
pub type Version = BTreeMap<String, String>;

/// A resource `source` configuration map.
pub type SourceMap = serde_json::Map<String, serde_json::Value>;

/// How a Get step picks its version from the check output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionMode {
    /// Last element of the check output.
    Latest,
    /// First version not yet recorded in the pipeline-scoped log; falls back
    /// to the last element when all have been seen.
    Every,
    /// The exact version map given in the step.
    Pinned(Version),
}

impl VersionMode {
    /// Resolve the raw `version` field of a Get step into a mode.
    pub fn resolve(spec: Option<&VersionSpec>) -> Result<VersionMode, ConfigError> {
        match spec {
            None => Ok(VersionMode::Latest),
            Some(VersionSpec::Mode(mode)) => match mode.as_str() {
                "latest" => Ok(VersionMode::Latest),
                "every" => Ok(VersionMode::Every),
                other => Err(ConfigError::UnknownVersionMode {
                    mode: other.to_string(),
                }),
            },
            Some(VersionSpec::Pinned(version)) => Ok(VersionMode::Pinned(version.clone())),
        }
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
