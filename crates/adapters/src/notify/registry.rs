// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named notification channels.

use super::{NoOpNotifyAdapter, NotifyAdapter};
use std::collections::HashMap;
use std::sync::Arc;

/// Channel name used when a pipeline does not pick one explicitly.
pub const DEFAULT_CHANNEL: &str = "default";

/// Maps channel names to notification adapters.
///
/// Constructed per pipeline invocation; cheap to clone.
#[derive(Clone)]
pub struct NotifyRegistry {
    channels: HashMap<String, Arc<dyn NotifyAdapter>>,
}

impl Default for NotifyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            channels: HashMap::new(),
        };
        registry.insert(DEFAULT_CHANNEL, NoOpNotifyAdapter::new());
        registry
    }
}

impl NotifyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under a channel name, replacing any existing one.
    pub fn insert(&mut self, name: impl Into<String>, adapter: impl NotifyAdapter) {
        self.channels.insert(name.into(), Arc::new(adapter));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NotifyAdapter>> {
        self.channels.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
