// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters — fire-and-forget formatted status messages.

mod noop;
mod slack;

pub use noop::NoOpNotifyAdapter;
pub use slack::SlackNotifyAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending a formatted status message somewhere an operator
/// will see it. Failures are logged by callers, never propagated into the
/// controller's command path — a notification is best-effort.
#[async_trait]
pub trait NotifyAdapter: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Lets the daemon pick a concrete notifier (Slack or no-op) at startup
/// based on configuration and hand the controller a single trait object,
/// rather than making `Controller` generic over which one was chosen.
#[async_trait]
impl NotifyAdapter for std::sync::Arc<dyn NotifyAdapter> {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.as_ref().notify(message).await
    }
}
