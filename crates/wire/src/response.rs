// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// `200 OK` body for `POST /result` and `POST /error`. Only ever
/// serialized by the coordinator, never parsed back by the worker (which
/// matches on status code alone), so `status` stays `&'static str`
/// rather than forcing an allocation just to support a `Deserialize`
/// impl nothing needs.
#[derive(Debug, Clone, Serialize)]
pub struct OkResponseBody {
    pub status: &'static str,
}

impl Default for OkResponseBody {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// `400`/`404` error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    pub detail: String,
}
