// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;
use td_core::{Clock, TaskId};
use td_wire::{headers, ErrorRequest, OkResponseBody, ResultRequest, SidecarMetadata};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use super::state::AppState;
use crate::error::DispatchError;

/// `GET /task`: claim a row, validate its sidecar, and stream the audio
/// body. A sidecar failure fails that row and loops to the next
/// candidate, up to `k_attempts` times, so one broken sidecar never
/// yields a 5xx (spec.md §4.3).
pub async fn get_task(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, DispatchError> {
    let ip = addr.ip().to_string();
    let now = state.clock.now_unix_secs();

    for _ in 0..state.k_attempts {
        let claimed = state.store.claim_one(&ip, now, state.lease_secs)?;
        let Some(claimed) = claimed else {
            info!(%ip, "no available file");
            return Ok(StatusCode::NO_CONTENT.into_response());
        };

        let audio_path = std::path::Path::new(&claimed.path);
        match SidecarMetadata::load_for_audio(audio_path) {
            Ok(meta) => {
                let file = match tokio::fs::File::open(audio_path).await {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(path = %claimed.path, error = %e, "failed to open claimed audio file");
                        state.store.fail(&claimed.task_id)?;
                        continue;
                    }
                };

                info!(
                    path = %claimed.path,
                    task_id = %claimed.task_id,
                    language = %meta.language,
                    %ip,
                    "assigned task",
                );

                let stream = ReaderStream::with_capacity(file, state.chunk_size);
                let body = Body::from_stream(stream);

                let mut response = Response::new(body);
                let headers = response.headers_mut();
                headers.insert(
                    headers::X_TASK_ID,
                    HeaderValue::from_str(claimed.task_id.as_str())
                        .unwrap_or(HeaderValue::from_static("")),
                );
                headers.insert(
                    headers::X_LANGUAGE,
                    HeaderValue::from_str(&meta.language).unwrap_or(HeaderValue::from_static("")),
                );
                headers.insert(
                    axum::http::header::CONTENT_TYPE,
                    HeaderValue::from_static("audio/mpeg"),
                );
                return Ok(response);
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(path = %claimed.path, error = %reason, %ip, "sidecar validation failed");
                state.store.fail(&claimed.task_id)?;
                let _ = state.audit.record(
                    &state.clock,
                    &claimed.path,
                    claimed.task_id.as_str(),
                    &ip,
                    &reason,
                );
            }
        }
    }

    info!(%ip, "max attempts reached");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `POST /result`: write the artifact, then (only on success) transition
/// the row to `completed`. A crash between these two steps is safe — the
/// next reconciliation observes the artifact and refuses to resurrect.
pub async fn post_result(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ResultRequest>,
) -> Result<Json<OkResponseBody>, DispatchError> {
    let task_id = TaskId::from_hex(&req.id)
        .ok_or_else(|| DispatchError::MalformedRequest("id is not a valid task id".into()))?;

    let path = state
        .store
        .path_for_in_progress(&task_id)?
        .ok_or(DispatchError::UnknownTaskId)?;

    let vtt_path = std::path::Path::new(&path).with_extension("vtt");
    tokio::fs::write(&vtt_path, &req.vtt)
        .await
        .map_err(DispatchError::ArtifactWriteFailed)?;

    if !state.store.complete(&task_id)? {
        return Err(DispatchError::UnknownTaskId);
    }

    let ip = addr.ip().to_string();
    let _ = state.audit.record(&state.clock, &path, &req.id, &ip, "");
    info!(%path, task_id = %req.id, %ip, vtt_path = %vtt_path.display(), "completed task");

    Ok(Json(OkResponseBody::default()))
}

/// `POST /error`: transition the row to `failed`. The error text is
/// logged but never stored on the row.
pub async fn post_error(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ErrorRequest>,
) -> Result<Json<OkResponseBody>, DispatchError> {
    let task_id = TaskId::from_hex(&req.id)
        .ok_or_else(|| DispatchError::MalformedRequest("id is not a valid task id".into()))?;

    let path = state
        .store
        .path_for_in_progress(&task_id)?
        .ok_or(DispatchError::UnknownTaskId)?;

    if !state.store.fail(&task_id)? {
        return Err(DispatchError::UnknownTaskId);
    }

    let ip = addr.ip().to_string();
    let reason = req.error.as_deref().unwrap_or("unknown error");
    let _ = state.audit.record(&state.clock, &path, &req.id, &ip, reason);
    warn!(%path, task_id = %req.id, %ip, error = %reason, "task reported failed");

    Ok(Json(OkResponseBody::default()))
}
