// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters and the named-channel registry.

mod desktop;
mod noop;
mod registry;

pub use desktop::DesktopNotifyAdapter;
pub use noop::NoOpNotifyAdapter;
pub use registry::{NotifyRegistry, DEFAULT_CHANNEL};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending notifications.
///
/// Object-safe so heterogeneous adapters can share one channel registry.
#[async_trait]
pub trait NotifyAdapter: Send + Sync + 'static {
    /// Send a notification with a title and message body
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}
