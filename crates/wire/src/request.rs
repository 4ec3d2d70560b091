// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Body of `POST /result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRequest {
    pub id: String,
    pub vtt: String,
}

/// Body of `POST /error`. `error` is logged but never stored on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
