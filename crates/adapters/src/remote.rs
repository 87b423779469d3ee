// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote control client — an optional poll loop, enabled by
//! `manualcontrol=true`, that authenticates through [`crate::whydah`] and
//! periodically asks a remote endpoint for queued deploy/restart
//! directives. This is boundary-only: dispatched commands are ordinary
//! engine commands, and the engine has no notion that one originated
//! remotely.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::whydah::{WhydahClient, WhydahError};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RemoteControlError {
    #[error("remote control request failed: {0}")]
    Request(#[from] WhydahError),
}

/// A directive queued by the remote control plane. `target` names which
/// slot the directive applies to, where applicable.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteDirective {
    Deploy,
    Restart { target: RemoteSlot },
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSlot {
    Running,
    Testing,
}

#[derive(Deserialize)]
struct PollResponse {
    directives: Vec<RemoteDirective>,
}

/// Poll `poll_uri` every [`POLL_INTERVAL`], forwarding each directive
/// received on the returned channel. The loop exits when `cancel` fires.
pub fn poll_remote_control(
    client: Arc<WhydahClient>,
    poll_uri: String,
    cancel: CancellationToken,
) -> mpsc::Receiver<RemoteDirective> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    match fetch_directives(&client, &poll_uri).await {
                        Ok(directives) => {
                            for directive in directives {
                                if tx.send(directive).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "remote control poll failed");
                        }
                    }
                }
            }
        }
    });

    rx
}

async fn fetch_directives(client: &WhydahClient, poll_uri: &str) -> Result<Vec<RemoteDirective>, RemoteControlError> {
    let response: PollResponse = client.post_auth_json(poll_uri, &serde_json::json!({})).await?;
    Ok(response.directives)
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
