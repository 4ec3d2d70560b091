// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the dispatch coordinator's three endpoints (spec.md
//! §6). A thin wrapper over `reqwest`; every method maps the wire
//! protocol onto the worker's own error kinds rather than leaking
//! `reqwest::Error` past this module.

use std::path::Path;

use futures_util::StreamExt;
use td_wire::headers;
use tokio::io::AsyncWriteExt;

use crate::error::WorkerError;

/// One claimed task: the id and language the coordinator handed back on
/// `GET /task`, with the audio body already streamed to `dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: String,
    pub language: String,
}

pub struct DispatchClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
}

impl DispatchClient {
    pub fn new(base_url: impl Into<String>, auth: Option<(String, String)>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            auth,
        }
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// `GET /task`: on `200`, stream the audio body to `dest` at a fixed
    /// chunk size without buffering the whole file in memory, and return
    /// the assignment read off `X-Task-ID`/`X-Language`. `204` and
    /// transient non-2xx responses both yield `Ok(None)` — the caller
    /// sleeps `T_idle` and retries either way (spec.md §4.4 step 1).
    pub async fn poll_task(&self, dest: &Path) -> Result<Option<Assignment>, WorkerError> {
        let response = self
            .with_auth(self.http.get(format!("{}/task", self.base_url)))
            .send()
            .await
            .map_err(|e| WorkerError::PollTransient(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(WorkerError::PollTransient(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let task_id = response
            .headers()
            .get(headers::X_TASK_ID)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| WorkerError::PollTransient("missing X-Task-ID header".into()))?
            .to_string();
        let language = response
            .headers()
            .get(headers::X_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| WorkerError::PollTransient("missing X-Language header".into()))?
            .to_string();

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| WorkerError::DownloadFailed(e.to_string()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WorkerError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| WorkerError::DownloadFailed(e.to_string()))?;
        }
        file.flush().await.map_err(|e| WorkerError::DownloadFailed(e.to_string()))?;

        Ok(Some(Assignment { task_id, language }))
    }

    /// `POST /result`. Returns `Ok(true)` on `200`, `Ok(false)` on `404`
    /// (the lease expired and the task was reassigned — the caller falls
    /// back to the durability ladder rather than retrying forever).
    pub async fn post_result(&self, task_id: &str, vtt: &str) -> Result<bool, WorkerError> {
        let body = td_wire::ResultRequest { id: task_id.to_string(), vtt: vtt.to_string() };
        let response = self
            .with_auth(self.http.post(format!("{}/result", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkerError::UploadFailed(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(WorkerError::UploadFailed(format!("unexpected status {status}"))),
        }
    }

    /// `POST /error`. Same `200`/`404` mapping as `post_result`.
    pub async fn post_error(&self, task_id: &str, error: Option<&str>) -> Result<bool, WorkerError> {
        let body = td_wire::ErrorRequest {
            id: task_id.to_string(),
            error: error.map(|s| s.to_string()),
        };
        let response = self
            .with_auth(self.http.post(format!("{}/error", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkerError::ReportFailed(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(WorkerError::ReportFailed(format!("unexpected status {status}"))),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
