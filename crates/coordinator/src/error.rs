// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use td_wire::ErrorResponseBody;
use thiserror::Error;

/// Errors a dispatch handler can return. Each maps to exactly the status
/// code spec.md §7 assigns it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown task id")]
    UnknownTaskId,

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("failed to write artifact: {0}")]
    ArtifactWriteFailed(#[source] std::io::Error),

    #[error(transparent)]
    Storage(#[from] td_storage::StorageError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::UnknownTaskId => StatusCode::NOT_FOUND,
            DispatchError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::ArtifactWriteFailed(_) | DispatchError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponseBody {
            detail: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}
