// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn version(pairs: &[(&str, &str)]) -> Version {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn no_spec_resolves_to_latest() {
    assert_eq!(VersionMode::resolve(None).unwrap(), VersionMode::Latest);
}

#[test]
fn every_keyword_resolves() {
    let spec = VersionSpec::Mode("every".to_string());
    assert_eq!(
        VersionMode::resolve(Some(&spec)).unwrap(),
        VersionMode::Every
    );
}

#[test]
fn latest_keyword_resolves() {
    let spec = VersionSpec::Mode("latest".to_string());
    assert_eq!(
        VersionMode::resolve(Some(&spec)).unwrap(),
        VersionMode::Latest
    );
}

#[test]
fn unknown_keyword_is_rejected() {
    let spec = VersionSpec::Mode("newest".to_string());
    assert!(VersionMode::resolve(Some(&spec)).is_err());
}

#[test]
fn map_resolves_to_pinned() {
    let pinned = version(&[("ref", "abc123")]);
    let spec = VersionSpec::Pinned(pinned.clone());
    assert_eq!(
        VersionMode::resolve(Some(&spec)).unwrap(),
        VersionMode::Pinned(pinned)
    );
}
