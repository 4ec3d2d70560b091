// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Coordinator configuration, sourced entirely from environment variables
/// (there is no config file; the original has none and this workspace
/// doesn't introduce scope creep by adding one).
#[derive(Parser, Debug, Clone)]
#[command(name = "td-coordinatord")]
#[command(about = "Dispatch coordinator for the audio transcription fleet")]
pub struct Config {
    /// Root of the recursive audio tree the reconciler walks.
    #[arg(long, env = "AUDIO_DIR", default_value = "/mnt/data/video")]
    pub audio_dir: PathBuf,

    /// Path to the SQLite task store.
    #[arg(long, env = "DB_FILE", default_value = "tasks.db")]
    pub db_file: PathBuf,

    /// Directory for daily rolling log files.
    #[arg(long, env = "LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Address the dispatch API binds to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Lease duration in seconds for an `in_progress` row.
    #[arg(long, env = "T_LEASE_SECS", default_value_t = 360_000)]
    pub lease_secs: u64,

    /// Reconciler interval in seconds.
    #[arg(long, env = "T_SYNC_SECS", default_value_t = 300)]
    pub sync_secs: u64,

    /// Consecutive metadata-validation failures `GET /task` tolerates
    /// before returning `204` instead of continuing to look for a
    /// claimable row.
    #[arg(long, env = "K_ATTEMPTS", default_value_t = 10)]
    pub k_attempts: u32,
}
