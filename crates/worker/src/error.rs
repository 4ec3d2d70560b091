// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side error kinds (spec.md §7). None of these ever escapes a
//! single task boundary: every path through the worker loop ends with
//! either a moved artifact, a marker file, or an audit row, never a
//! propagated exception.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("poll failed: {0}")]
    PollTransient(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("transcribe failed: {message}")]
    TranscribeFailed {
        message: String,
        stdout_tail: Vec<String>,
        stderr_tail: Vec<String>,
    },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("report failed: {0}")]
    ReportFailed(String),
}

impl WorkerError {
    /// The subprocess ring buffer tails, if this error kind carries any
    /// (spec.md §7: operator notifications append up to 20 lines of each).
    pub fn tails(&self) -> Option<(&[String], &[String])> {
        match self {
            WorkerError::TranscribeFailed { stdout_tail, stderr_tail, .. } => {
                Some((stdout_tail, stderr_tail))
            }
            _ => None,
        }
    }
}
