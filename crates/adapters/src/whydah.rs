// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whydah-style application-credential auth: exchange an application
//! credential for a bearer token, cache it, and attach it to outgoing
//! requests. Shared by the Slack notifier and the remote-control poller,
//! the two subsystems that talk to `entraos_api_uri`.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const MAX_LOGON_ATTEMPTS: u32 = 10;
const LOGON_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum WhydahError {
    #[error("whydah logon failed after {0} attempts")]
    LogonFailed(u32),
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response body was not valid json: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct WhydahCredential {
    pub whydah_uri: String,
    pub application_id: String,
    pub application_name: String,
    pub application_secret: String,
}

#[derive(Serialize)]
struct LogonRequest<'a> {
    #[serde(rename = "applicationID")]
    application_id: &'a str,
    #[serde(rename = "applicationName")]
    application_name: &'a str,
    #[serde(rename = "applicationSecret")]
    application_secret: &'a str,
}

#[derive(serde::Deserialize)]
struct LogonResponse {
    #[serde(rename = "applicationtokenID")]
    application_token_id: String,
}

/// Caches a bearer token obtained from the configured Whydah token
/// service and re-authenticates on demand. One client is shared by every
/// caller that needs `entraos_api_uri` access.
pub struct WhydahClient {
    http: reqwest::Client,
    credential: WhydahCredential,
    token: Mutex<Option<String>>,
}

impl WhydahClient {
    pub fn new(http: reqwest::Client, credential: WhydahCredential) -> Self {
        Self { http, credential, token: Mutex::new(None) }
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn logon(&self) -> Result<String, WhydahError> {
        let mut last_err = None;
        for _ in 0..MAX_LOGON_ATTEMPTS {
            let result = self
                .http
                .post(format!("{}/tokenservice/logon", self.credential.whydah_uri))
                .form(&LogonRequest {
                    application_id: &self.credential.application_id,
                    application_name: &self.credential.application_name,
                    application_secret: &self.credential.application_secret,
                })
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(resp) => match resp.json::<LogonResponse>().await {
                    Ok(parsed) => {
                        let token = parsed.application_token_id;
                        *self.token.lock() = Some(token.clone());
                        return Ok(token);
                    }
                    Err(e) => last_err = Some(WhydahError::Decode(e)),
                },
                Err(e) => last_err = Some(WhydahError::Transport(e)),
            }
            tokio::time::sleep(LOGON_RETRY_DELAY).await;
        }
        tracing::warn!(error = ?last_err, "whydah logon exhausted retries");
        Err(WhydahError::LogonFailed(MAX_LOGON_ATTEMPTS))
    }

    /// POST `body` as JSON to `uri`, attaching a bearer token (fetching
    /// one first if none is cached). On a `401`, the cached token is
    /// dropped and a single re-logon + retry is attempted, matching the
    /// original's "re-authenticate on failure" behaviour.
    pub async fn post_auth<T: Serialize + ?Sized>(&self, uri: &str, body: &T) -> Result<(), WhydahError> {
        self.post_auth_internal(uri, body).await.map(|_| ())
    }

    /// Same as [`Self::post_auth`] but decodes the response body as JSON.
    pub async fn post_auth_json<T, R>(&self, uri: &str, body: &T) -> Result<R, WhydahError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.post_auth_internal(uri, body).await?;
        resp.json::<R>().await.map_err(WhydahError::Decode)
    }

    async fn post_auth_internal<T: Serialize + ?Sized>(
        &self,
        uri: &str,
        body: &T,
    ) -> Result<reqwest::Response, WhydahError> {
        let token = match self.cached_token() {
            Some(token) => token,
            None => self.logon().await?,
        };

        let resp = self.http.post(uri).bearer_auth(&token).json(body).send().await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            *self.token.lock() = None;
            let token = self.logon().await?;
            return Ok(self.http.post(uri).bearer_auth(&token).json(body).send().await?);
        }
        Ok(resp.error_for_status()?)
    }
}

#[cfg(test)]
#[path = "whydah_tests.rs"]
mod tests;
