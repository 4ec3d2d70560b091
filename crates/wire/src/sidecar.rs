// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sidecar metadata format: for audio file `X.mp3` the coordinator reads
//! `X.json` and requires `sql_params.language` to be a non-empty string.
//! Any other shape fails the task (spec §6).

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("missing sidecar file: {0}")]
    Missing(String),
    #[error("sidecar is not valid JSON: {0}")]
    Malformed(String),
    #[error("sidecar missing sql_params.language")]
    MissingLanguage,
    #[error("sidecar sql_params.language is empty")]
    EmptyLanguage,
}

#[derive(Debug, Deserialize)]
struct SqlParams {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSidecar {
    sql_params: Option<SqlParams>,
}

/// Validated sidecar metadata for one audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarMetadata {
    pub language: String,
}

impl SidecarMetadata {
    /// The sidecar path for an audio file: extension swapped to `.json`.
    pub fn path_for_audio(audio_path: &Path) -> std::path::PathBuf {
        audio_path.with_extension("json")
    }

    /// Read and validate the sidecar for an audio file.
    pub fn load_for_audio(audio_path: &Path) -> Result<Self, SidecarError> {
        let sidecar_path = Self::path_for_audio(audio_path);
        let text = std::fs::read_to_string(&sidecar_path)
            .map_err(|_| SidecarError::Missing(sidecar_path.display().to_string()))?;
        Self::parse(&text)
    }

    /// Parse and validate sidecar JSON text directly (used by tests and
    /// by the dispatch API once the file has been read).
    pub fn parse(text: &str) -> Result<Self, SidecarError> {
        let raw: RawSidecar =
            serde_json::from_str(text).map_err(|e| SidecarError::Malformed(e.to_string()))?;
        let language = raw
            .sql_params
            .and_then(|p| p.language)
            .ok_or(SidecarError::MissingLanguage)?;
        if language.is_empty() {
            return Err(SidecarError::EmptyLanguage);
        }
        Ok(Self { language })
    }
}

#[cfg(test)]
#[path = "sidecar_tests.rs"]
mod tests;
