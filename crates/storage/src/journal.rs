// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL journal store: every mutation is appended to a journal file and
//! replayed on open, giving crash-resume and cross-run resource-version
//! state without a database.
//!
//! Each entry is a single line of JSON: `{"op":"...", ...}\n`. Reads are
//! served from the replayed in-memory image. A corrupt tail (torn write)
//! is tolerated: replay stops at the first unparseable line.

use crate::memory::MemoryStore;
use crate::store::{
    PipelineEntry, ResourceVersionRecord, StepPayload, Store, StoreError, StoreRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use gantry_core::Version;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// File name of the journal inside a store directory.
const JOURNAL_FILE: &str = "journal.jsonl";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Put {
        path: String,
        fields: Map<String, Value>,
    },
    ResourceVersion {
        record: ResourceVersionRecord,
    },
    Pipeline {
        entry: PipelineEntry,
    },
}

/// Durable store backed by an append-only JSONL journal.
#[derive(Clone)]
pub struct JournalStore {
    mem: MemoryStore,
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl JournalStore {
    /// Open (or create) a journal under `dir` and replay it.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);
        let mem = MemoryStore::new();

        if path.exists() {
            replay(&path, &mem)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            mem,
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    /// Location of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let mut file = self.file.lock();
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

fn replay(path: &Path, mem: &MemoryStore) -> Result<(), StoreError> {
    let reader = BufReader::new(File::open(path)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: JournalEntry = match serde_json::from_str(trimmed) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    lineno,
                    %error,
                    "corrupt journal entry, stopping replay at corruption point",
                );
                break;
            }
        };
        match entry {
            JournalEntry::Put { path, fields } => mem.apply_put(&path, fields),
            JournalEntry::ResourceVersion { record } => {
                mem.apply_resource_version(record);
            }
            JournalEntry::Pipeline { entry } => {
                mem.apply_pipeline(entry);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Store for JournalStore {
    async fn put(&self, path: &str, payload: StepPayload) -> Result<(), StoreError> {
        let fields = payload.to_map()?;
        self.append(&JournalEntry::Put {
            path: path.to_string(),
            fields: fields.clone(),
        })?;
        self.mem.apply_put(path, fields);
        Ok(())
    }

    async fn get_all(&self, prefix: &str, fields: &[&str]) -> Result<Vec<StoreRecord>, StoreError> {
        self.mem.get_all(prefix, fields).await
    }

    async fn save_resource_version(
        &self,
        scoped_name: &str,
        version: &Version,
        job_name: &str,
    ) -> Result<(), StoreError> {
        let record = ResourceVersionRecord {
            scoped_name: scoped_name.to_string(),
            version: version.clone(),
            job_name: job_name.to_string(),
            created_at: Utc::now(),
        };
        // Dedup against the replayed image before paying for the append.
        if self.mem.apply_resource_version(record.clone()) {
            self.append(&JournalEntry::ResourceVersion { record })?;
        }
        Ok(())
    }

    async fn latest_resource_version(
        &self,
        scoped_name: &str,
    ) -> Result<Option<ResourceVersionRecord>, StoreError> {
        self.mem.latest_resource_version(scoped_name).await
    }

    async fn list_resource_versions(
        &self,
        scoped_name: &str,
        limit: usize,
    ) -> Result<Vec<ResourceVersionRecord>, StoreError> {
        self.mem.list_resource_versions(scoped_name, limit).await
    }

    async fn save_pipeline(&self, name: &str, path: &str) -> Result<(), StoreError> {
        let entry = PipelineEntry {
            name: name.to_string(),
            path: path.to_string(),
            created_at: Utc::now(),
        };
        if self.mem.apply_pipeline(entry.clone()) {
            self.append(&JournalEntry::Pipeline { entry })?;
        }
        Ok(())
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineEntry>, StoreError> {
        self.mem.list_pipelines().await
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
