// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error cases that both the coordinator and worker want to match
//! on by kind rather than by message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("task id is not valid hex: {0}")]
    InvalidTaskId(String),

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(std::path::PathBuf),
}
