// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and pipeline identifiers.

use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Length of the derived pipeline identifier.
const PIPELINE_ID_LEN: usize = 11;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`,
/// `From<&str>`, `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>`
/// implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Opaque identifier for a single pipeline invocation.
    pub struct RunId;
}

impl RunId {
    /// Generate a fresh run identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

define_id! {
    /// Stable identifier derived from a pipeline's absolute path.
    ///
    /// Two pipelines stored at different paths always get different IDs, so
    /// resource-version logs sharing a store stay isolated.
    pub struct PipelineId;
}

impl PipelineId {
    /// Derive the pipeline ID from the pipeline's absolute path: URL-safe
    /// base64 of the path's SHA-256, truncated to 11 characters.
    pub fn from_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
        Self(encoded.chars().take(PIPELINE_ID_LEN).collect())
    }
}

/// Build the pipeline-scoped key for a resource: `"{pipeline_id}/{name}"`.
///
/// Resource-version logs are keyed by this so pipelines sharing a store
/// never see each other's versions.
pub fn scoped_name(pipeline_id: &PipelineId, resource: &str) -> String {
    format!("{}/{}", pipeline_id, resource)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
