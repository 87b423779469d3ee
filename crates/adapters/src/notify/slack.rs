// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slack notifier — posts a formatted status message to a whydah-fronted
//! Slack bridge, matching `original_source/slack/slack.go`'s message
//! shape and channel-prefix formatting.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{NotifyAdapter, NotifyError};
use crate::whydah::WhydahClient;

#[derive(Serialize)]
struct SlackMessage<'a> {
    #[serde(rename = "recepientId")]
    recipient_id: &'a str,
    message: String,
    pinned: bool,
}

/// Formats `message` as `<app_icon>[<env_icon><env>-<service>]<message>`
/// and posts it through the shared [`WhydahClient`] to
/// `<entraos_api_uri>/slack/api/message`.
pub struct SlackNotifyAdapter {
    client: Arc<WhydahClient>,
    entraos_api_uri: String,
    slack_channel: String,
    app_icon: String,
    env_icon: String,
    env: String,
    service: String,
}

impl SlackNotifyAdapter {
    pub fn new(
        client: Arc<WhydahClient>,
        entraos_api_uri: impl Into<String>,
        slack_channel: impl Into<String>,
        app_icon: impl Into<String>,
        env_icon: impl Into<String>,
        env: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            client,
            entraos_api_uri: entraos_api_uri.into(),
            slack_channel: slack_channel.into(),
            app_icon: app_icon.into(),
            env_icon: env_icon.into(),
            env: env.into(),
            service: service.into(),
        }
    }

    fn format(&self, message: &str) -> String {
        format!("{}[{}{}-{}]{}", self.app_icon, self.env_icon, self.env, self.service, message)
    }
}

#[async_trait]
impl NotifyAdapter for SlackNotifyAdapter {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let formatted = self.format(message);
        tracing::info!(message = %formatted, "sending slack notification");
        self.client
            .post_auth(
                &format!("{}/slack/api/message", self.entraos_api_uri),
                &SlackMessage { recipient_id: &self.slack_channel, message: formatted, pinned: false },
            )
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;
