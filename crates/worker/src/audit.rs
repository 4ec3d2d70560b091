// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `processed.csv`: `(file_id, language, time_taken, audio_minutes,
//! status, reason)`, one row per task the pipeline resolved, grounded in
//! the original's `csv.DictWriter` usage (spec.md §6).

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct WorkerAuditLog {
    path: PathBuf,
    file: Mutex<()>,
}

impl WorkerAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_success(&self, file_id: &str, language: &str, time_taken: f64, audio_minutes: f64) {
        self.record(file_id, language, time_taken, audio_minutes, "success", "");
    }

    pub fn record_failure(
        &self,
        file_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        reason: &str,
    ) {
        self.record(file_id, language, time_taken, audio_minutes, "failure", reason);
    }

    fn record(
        &self,
        file_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        status: &str,
        reason: &str,
    ) {
        if let Err(e) = self.try_record(file_id, language, time_taken, audio_minutes, status, reason) {
            tracing::warn!(error = %e, "failed to write audit CSV row");
        }
    }

    fn try_record(
        &self,
        file_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        status: &str,
        reason: &str,
    ) -> std::io::Result<()> {
        let _guard = self.file.lock().unwrap_or_else(|p| p.into_inner());

        let needs_header = !self.path.exists() || std::fs::metadata(&self.path)?.len() == 0;
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;

        if needs_header {
            writeln!(f, "file_id,language,time_taken,audio_minutes,status,reason")?;
        }
        writeln!(
            f,
            "{},{},{:.3},{:.3},{},{}",
            csv_escape(file_id),
            csv_escape(language),
            time_taken,
            audio_minutes,
            status,
            csv_escape(reason),
        )?;
        Ok(())
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
