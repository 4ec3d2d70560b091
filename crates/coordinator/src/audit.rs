// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `processed.csv`: `(filepath, fileid, ip, datetime, error)`, one row per
//! dispatch decision that resolved a task (claim failure, result, error).
//! Grounded directly in the original's `log_to_csv`.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use td_core::Clock;

pub struct AuditLog {
    path: PathBuf,
    file: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(()),
        }
    }

    /// Append one row, writing the header first if the file is new or empty.
    pub fn record(
        &self,
        clock: &impl Clock,
        filepath: &str,
        fileid: &str,
        ip: &str,
        error: &str,
    ) -> std::io::Result<()> {
        let _guard = self.file.lock().unwrap_or_else(|p| p.into_inner());

        let needs_header = !self.path.exists() || std::fs::metadata(&self.path)?.len() == 0;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if needs_header {
            writeln!(f, "filepath,fileid,ip,datetime,error")?;
        }
        let datetime = clock.now_unix_secs();
        writeln!(
            f,
            "{},{},{},{},{}",
            csv_escape(filepath),
            csv_escape(fileid),
            csv_escape(ip),
            datetime,
            csv_escape(error)
        )?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
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
