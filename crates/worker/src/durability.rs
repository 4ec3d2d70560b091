// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's three-bin durability ladder (spec.md §4.4, §4.5, §6).
//!
//! The worker's crash envelope spans two independent axes: the artifact
//! may or may not exist, and the coordinator may or may not have been
//! informed. `uploaded/` is terminal (kept for audit); `not_uploaded/`
//! holds an artifact whose upload is still owed; `failed_report/` holds
//! empty marker files named by task id, meaning an error notification is
//! still owed. No state is ever kept solely in memory after a successful
//! subprocess step — every reachable combination has a directory.

use std::path::{Path, PathBuf};

/// Directory names exactly as spec.md §6's persisted state layout.
const UPLOADED_DIR: &str = "processed_uploaded";
const NOT_UPLOADED_DIR: &str = "processed_not_uploaded";
const FAILED_REPORT_DIR: &str = "not_processed_failed_report";

pub struct DurabilityBins {
    uploaded: PathBuf,
    not_uploaded: PathBuf,
    failed_report: PathBuf,
}

impl DurabilityBins {
    /// Create the three bins under `base` if absent, matching the
    /// original's `os.makedirs(..., exist_ok=True)`.
    pub fn ensure(base: &Path) -> std::io::Result<Self> {
        let bins = Self {
            uploaded: base.join(UPLOADED_DIR),
            not_uploaded: base.join(NOT_UPLOADED_DIR),
            failed_report: base.join(FAILED_REPORT_DIR),
        };
        std::fs::create_dir_all(&bins.uploaded)?;
        std::fs::create_dir_all(&bins.not_uploaded)?;
        std::fs::create_dir_all(&bins.failed_report)?;
        Ok(bins)
    }

    fn vtt_path(dir: &Path, task_id: &str) -> PathBuf {
        dir.join(format!("{task_id}.vtt"))
    }

    /// Move a just-uploaded artifact into the terminal `uploaded/` bin.
    pub fn move_to_uploaded(&self, src: &Path, task_id: &str) -> std::io::Result<PathBuf> {
        let dest = Self::vtt_path(&self.uploaded, task_id);
        std::fs::rename(src, &dest)?;
        Ok(dest)
    }

    /// Move an artifact whose upload failed into `not_uploaded/`.
    pub fn move_to_not_uploaded(&self, src: &Path, task_id: &str) -> std::io::Result<PathBuf> {
        let dest = Self::vtt_path(&self.not_uploaded, task_id);
        std::fs::rename(src, &dest)?;
        Ok(dest)
    }

    fn marker_path(&self, task_id: &str) -> PathBuf {
        self.failed_report.join(task_id)
    }

    /// Create an empty marker meaning an error report is still owed.
    pub fn mark_failed_report(&self, task_id: &str) -> std::io::Result<()> {
        std::fs::File::create(self.marker_path(task_id))?;
        Ok(())
    }

    /// Remove the marker, if any — the error has now been reported.
    pub fn clear_failed_report(&self, task_id: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.marker_path(task_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn has_failed_report(&self, task_id: &str) -> bool {
        self.marker_path(task_id).exists()
    }

    pub fn uploaded_dir(&self) -> &Path {
        &self.uploaded
    }

    pub fn not_uploaded_dir(&self) -> &Path {
        &self.not_uploaded
    }

    pub fn failed_report_dir(&self) -> &Path {
        &self.failed_report
    }

    /// `(task_id, path)` for every `.vtt` owed in `not_uploaded/`, used by
    /// the retry driver's first pass.
    pub fn list_not_uploaded(&self) -> std::io::Result<Vec<(String, PathBuf)>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.not_uploaded)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("vtt") {
                continue;
            }
            if let Some(task_id) = path.file_stem().and_then(|s| s.to_str()) {
                out.push((task_id.to_string(), path));
            }
        }
        Ok(out)
    }

    /// Task ids with an outstanding `failed_report/` marker, used by the
    /// retry driver's second pass.
    pub fn list_failed_report(&self) -> std::io::Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.failed_report)? {
            let entry = entry?;
            if let Some(task_id) = entry.file_name().to_str() {
                out.push(task_id.to_string());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "durability_tests.rs"]
mod tests;
