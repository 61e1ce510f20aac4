// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[test]
fn pipeline_id_is_eleven_chars() {
    let id = PipelineId::from_path(&PathBuf::from("/home/ci/pipeline.json"));
    assert_eq!(id.as_str().len(), 11);
}

#[test]
fn pipeline_id_is_stable() {
    let a = PipelineId::from_path(&PathBuf::from("/home/ci/pipeline.json"));
    let b = PipelineId::from_path(&PathBuf::from("/home/ci/pipeline.json"));
    assert_eq!(a, b);
}

#[test]
fn pipeline_ids_differ_for_distinct_paths() {
    let a = PipelineId::from_path(&PathBuf::from("/home/ci/a.json"));
    let b = PipelineId::from_path(&PathBuf::from("/home/ci/b.json"));
    assert_ne!(a, b);
}

#[test]
fn pipeline_id_is_url_safe() {
    let id = PipelineId::from_path(&PathBuf::from("/some/deeply/nested/pipeline.json"));
    assert!(id
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn scoped_name_joins_with_slash() {
    let id = PipelineId::new("abc123def45");
    assert_eq!(scoped_name(&id, "repo"), "abc123def45/repo");
}

#[test]
fn run_ids_are_unique() {
    assert_ne!(RunId::generate(), RunId::generate());
}

#[test]
fn id_short_truncates() {
    let id = RunId::new("0123456789");
    assert_eq!(id.short(4), "0123");
    assert_eq!(id.short(20), "0123456789");
}
