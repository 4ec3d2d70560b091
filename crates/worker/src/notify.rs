// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator notifications (spec.md §7): best-effort, never propagated —
//! a failure to notify is logged and dropped. The production adapter
//! posts to a Gotify gateway; configuration is `GOTIFY_URL`/`GOTIFY_KEY`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait NotifyAdapter: Send + Sync + 'static {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;

    /// Best-effort wrapper used by every call site in the worker loop:
    /// logs and swallows failures rather than propagating them.
    async fn notify_best_effort(&self, title: &str, message: &str) {
        if let Err(e) = self.notify(title, message).await {
            tracing::warn!(%title, error = %e, "operator notification failed");
        }
    }
}

#[derive(Serialize)]
struct GotifyMessage<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

/// Posts `{title, message}` to `{url}/message?token={key}`.
pub struct GotifyNotifyAdapter {
    http: reqwest::Client,
    url: String,
    key: String,
    node_name: String,
}

impl GotifyNotifyAdapter {
    pub fn new(url: impl Into<String>, key: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            key: key.into(),
            node_name: node_name.into(),
        }
    }
}

#[async_trait]
impl NotifyAdapter for GotifyNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = format!("[{}] {}", self.node_name, title);
        let body = GotifyMessage { title: &title, message, priority: 5 };
        let response = self
            .http
            .post(format!("{}/message?token={}", self.url, self.key))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::SendFailed(format!("gotify returned {}", response.status())));
        }
        Ok(())
    }
}

/// No-op adapter used when Gotify isn't configured.
pub struct NoopNotifyAdapter;

#[async_trait]
impl NotifyAdapter for NoopNotifyAdapter {
    async fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}


#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
