// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store used by tests and one-shot runs.

use crate::store::{
    PipelineEntry, ResourceVersionRecord, StepPayload, Store, StoreError, StoreRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use gantry_core::Version;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<String, Map<String, Value>>,
    versions: HashMap<String, Vec<ResourceVersionRecord>>,
    pipelines: Vec<PipelineEntry>,
}

/// Store backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn apply_put(&self, path: &str, fields: Map<String, Value>) {
        self.state.lock().records.insert(path.to_string(), fields);
    }

    /// Append a version record unless the same version is already logged.
    /// Returns whether the record was appended.
    pub(crate) fn apply_resource_version(&self, record: ResourceVersionRecord) -> bool {
        let mut state = self.state.lock();
        let log = state.versions.entry(record.scoped_name.clone()).or_default();
        if log.iter().any(|entry| entry.version == record.version) {
            return false;
        }
        log.push(record);
        true
    }

    /// Record a pipeline, idempotent by name. Returns whether anything
    /// changed (new entry, or an existing entry repointed at a new path).
    pub(crate) fn apply_pipeline(&self, entry: PipelineEntry) -> bool {
        let mut state = self.state.lock();
        if let Some(existing) = state
            .pipelines
            .iter_mut()
            .find(|existing| existing.name == entry.name)
        {
            if existing.path == entry.path {
                return false;
            }
            existing.path = entry.path;
            return true;
        }
        state.pipelines.push(entry);
        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, path: &str, payload: StepPayload) -> Result<(), StoreError> {
        self.apply_put(path, payload.to_map()?);
        Ok(())
    }

    async fn get_all(&self, prefix: &str, fields: &[&str]) -> Result<Vec<StoreRecord>, StoreError> {
        let state = self.state.lock();
        let records = state
            .records
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, record)| StoreRecord {
                path: path.clone(),
                fields: fields
                    .iter()
                    .filter_map(|field| {
                        record
                            .get(*field)
                            .map(|value| ((*field).to_string(), value.clone()))
                    })
                    .collect(),
            })
            .collect();
        Ok(records)
    }

    async fn save_resource_version(
        &self,
        scoped_name: &str,
        version: &Version,
        job_name: &str,
    ) -> Result<(), StoreError> {
        self.apply_resource_version(ResourceVersionRecord {
            scoped_name: scoped_name.to_string(),
            version: version.clone(),
            job_name: job_name.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn latest_resource_version(
        &self,
        scoped_name: &str,
    ) -> Result<Option<ResourceVersionRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .versions
            .get(scoped_name)
            .and_then(|log| log.last().cloned()))
    }

    async fn list_resource_versions(
        &self,
        scoped_name: &str,
        limit: usize,
    ) -> Result<Vec<ResourceVersionRecord>, StoreError> {
        let state = self.state.lock();
        let mut records: Vec<_> = state
            .versions
            .get(scoped_name)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default();
        if limit > 0 {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn save_pipeline(&self, name: &str, path: &str) -> Result<(), StoreError> {
        self.apply_pipeline(PipelineEntry {
            name: name.to_string(),
            path: path.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineEntry>, StoreError> {
        Ok(self.state.lock().pipelines.clone())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
