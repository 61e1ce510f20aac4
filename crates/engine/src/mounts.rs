// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job mount map.
//!
//! Volumes are created on first reference within a job and live until the
//! driver is closed. All writers within a job are serialized except under
//! `in_parallel`, so the map sits behind a mutex.

use gantry_adapters::{Driver, DriverError, Volume};
use gantry_core::sanitize_cache_name;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Logical-name to volume mapping for one job.
#[derive(Default)]
pub struct MountSet {
    volumes: Mutex<IndexMap<String, Volume>>,
}

impl MountSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Volume for an input/output artifact name; created anonymously on
    /// first reference.
    pub async fn artifact(
        &self,
        driver: &impl Driver,
        name: &str,
    ) -> Result<Volume, DriverError> {
        self.ensure(driver, name, None).await
    }

    /// Volume for a resource; driver-named after the resource so it is
    /// stable across runs when the driver supports named volumes.
    pub async fn resource(
        &self,
        driver: &impl Driver,
        name: &str,
    ) -> Result<Volume, DriverError> {
        self.ensure(driver, name, Some(name)).await
    }

    /// Volume for a task cache path, named `cache-<sanitized>`.
    ///
    /// Returns the volume and the in-task mount location (leading slashes
    /// stripped).
    pub async fn cache(
        &self,
        driver: &impl Driver,
        path: &str,
    ) -> Result<(Volume, String), DriverError> {
        let cache_name = sanitize_cache_name(path);
        let volume = self.ensure(driver, &cache_name, Some(&cache_name)).await?;
        let at = path.trim_start_matches('/').to_string();
        Ok((volume, at))
    }

    async fn ensure(
        &self,
        driver: &impl Driver,
        logical: &str,
        named: Option<&str>,
    ) -> Result<Volume, DriverError> {
        if let Some(volume) = self.volumes.lock().get(logical) {
            return Ok(volume.clone());
        }
        let created = driver.create_volume(named).await?;
        let mut volumes = self.volumes.lock();
        // A parallel sibling may have raced us here; first insert wins.
        let volume = volumes
            .entry(logical.to_string())
            .or_insert(created)
            .clone();
        Ok(volume)
    }

    pub fn get(&self, logical: &str) -> Option<Volume> {
        self.volumes.lock().get(logical).cloned()
    }

    /// All logical names currently mapped, in first-reference order.
    pub fn logical_names(&self) -> Vec<String> {
        self.volumes.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "mounts_tests.rs"]
mod tests;
