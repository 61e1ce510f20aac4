// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations for the gantry binary.

use anyhow::Context as _;
use gantry_adapters::{DesktopNotifyAdapter, NativeDriver, NotifyRegistry, ResourceRegistry};
use gantry_core::{parse_duration, PipelineConfig, PipelineId, RunId};
use gantry_engine::{EngineDeps, PipelineRunner};
use gantry_storage::{JournalStore, Store as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn load_pipeline(file: &Path) -> anyhow::Result<(PipelineConfig, PathBuf)> {
    let path = file
        .canonicalize()
        .with_context(|| format!("pipeline file not found: {}", file.display()))?;
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid pipeline definition in {}", path.display()))?;
    Ok((config, path))
}

fn pipeline_name(config: &PipelineConfig, path: &Path, flag: Option<String>) -> String {
    flag.or_else(|| config.name.clone()).unwrap_or_else(|| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("pipeline")
            .to_string()
    })
}

/// Run a pipeline to completion against the native driver and the journal
/// store under the store directory.
pub async fn run(store_dir: &Path, file: &Path, timeout: Option<String>) -> anyhow::Result<()> {
    let (config, path) = load_pipeline(file)?;
    let pipeline_id = PipelineId::from_path(&path);
    let run_id = RunId::generate();

    let store = Arc::new(JournalStore::open(store_dir)?);
    let driver = Arc::new(NativeDriver::new(
        store_dir.join("driver"),
        pipeline_id.as_str(),
    ));
    let mut notify = NotifyRegistry::new();
    notify.insert("desktop", DesktopNotifyAdapter::new());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling pipeline");
            signal_cancel.cancel();
        }
    });

    let deadline = match timeout.as_deref().or(config.timeout.as_deref()) {
        Some(value) => Some(parse_duration(value)?),
        None => None,
    };
    if let Some(duration) = deadline {
        let timeout_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            tracing::warn!(?duration, "pipeline timeout reached, cancelling");
            timeout_cancel.cancel();
        });
    }

    tracing::info!(%pipeline_id, %run_id, file = %path.display(), "running pipeline");
    let runner = PipelineRunner::new(
        config,
        EngineDeps {
            driver,
            store,
            resources: ResourceRegistry::builtin(),
            notify,
        },
        run_id.clone(),
        pipeline_id,
        cancel,
    );
    runner.run().await?;
    println!("run {run_id} succeeded");
    Ok(())
}

/// Register a pipeline by name; repeated sets of the same name are no-ops.
pub async fn set(store_dir: &Path, file: &Path, name: Option<String>) -> anyhow::Result<()> {
    let (config, path) = load_pipeline(file)?;
    let native_types = ResourceRegistry::builtin().type_names();
    let native_refs: Vec<&str> = native_types.iter().map(String::as_str).collect();
    gantry_core::validate_with_types(&config, &native_refs)?;
    let name = pipeline_name(&config, &path, name);

    let store = JournalStore::open(store_dir)?;
    store
        .save_pipeline(&name, &path.to_string_lossy())
        .await?;
    println!("pipeline {name} set");
    Ok(())
}

/// Print the registered pipelines.
pub async fn list(store_dir: &Path) -> anyhow::Result<()> {
    let store = JournalStore::open(store_dir)?;
    let pipelines = store.list_pipelines().await?;
    if pipelines.is_empty() {
        println!("no pipelines set");
        return Ok(());
    }
    for entry in pipelines {
        println!("{}\t{}", entry.name, entry.path);
    }
    Ok(())
}
