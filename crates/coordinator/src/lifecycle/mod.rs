// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciler: periodically walks the audio root to (re)populate and heal
//! the task table from filesystem ground truth, and expires stale leases.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use td_core::{Clock, TaskStatus};
use td_storage::TaskStore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counts from one reconciliation pass, logged by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub inserted: u64,
    pub reset: u64,
    pub expired: u64,
}

/// One pass: walk `audio_root` for `.mp3` files missing a sibling `.vtt`,
/// insert/reset rows per spec.md §4.2's per-file rules, then expire any
/// stale lease surfaced by `ExpireLeases` even without new scan evidence.
pub fn reconcile_once(
    store: &TaskStore,
    audio_root: &Path,
    clock: &impl Clock,
) -> std::io::Result<ReconcileCounts> {
    let mut counts = ReconcileCounts::default();
    let now = clock.now_unix_secs();

    for entry in WalkDir::new(audio_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_mp3 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        if !is_mp3 {
            continue;
        }

        let vtt_path = path.with_extension("vtt");
        if vtt_path.exists() {
            continue;
        }

        let path_str = path.to_string_lossy().into_owned();
        let status = store
            .status_of(&path_str)
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        match status {
            None => {
                store
                    .upsert_pending(&path_str)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                counts.inserted += 1;
                debug!(path = %path_str, "inserted pending row");
            }
            Some(TaskStatus::Pending) => {}
            Some(TaskStatus::InProgress) => {
                let lease_expiry = store
                    .lease_expiry_of(&path_str)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                if lease_expiry.is_some_and(|expiry| expiry < now) {
                    store
                        .reset_to_pending(&path_str)
                        .map_err(|e| std::io::Error::other(e.to_string()))?;
                    counts.reset += 1;
                    debug!(path = %path_str, "reset expired in_progress row to pending");
                }
            }
            Some(TaskStatus::Failed) | Some(TaskStatus::Completed) => {
                // Artifact missing despite a terminal status: redo the work.
                store
                    .reset_to_pending(&path_str)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                counts.reset += 1;
                debug!(path = %path_str, "reset terminal row with missing artifact to pending");
            }
        }
    }

    counts.expired = store
        .expire_leases(now)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(counts)
}

/// Runs `reconcile_once` every `interval`, forever. The caller is expected
/// to have already run one synchronous pass before spawning this.
pub async fn run_periodic(
    store: Arc<TaskStore>,
    audio_root: std::path::PathBuf,
    clock: impl Clock,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it, caller did the startup pass
    loop {
        ticker.tick().await;
        match reconcile_once(&store, &audio_root, &clock) {
            Ok(counts) => {
                if counts.inserted > 0 || counts.reset > 0 || counts.expired > 0 {
                    info!(
                        inserted = counts.inserted,
                        reset = counts.reset,
                        expired = counts.expired,
                        "directory sync completed"
                    );
                } else {
                    debug!("directory sync completed: nothing to do");
                }
            }
            Err(e) => warn!("directory sync failed: {}", e),
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
