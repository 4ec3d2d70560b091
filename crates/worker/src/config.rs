// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Worker configuration, sourced entirely from environment variables plus
/// the single `--retry-failed` mode switch (spec.md §6). There is no
/// config file, matching the coordinator.
#[derive(Parser, Debug, Clone)]
#[command(name = "td-worker")]
#[command(about = "Polling worker: claims tasks, transcribes audio, reports results")]
pub struct Config {
    /// Switch from Worker Loop to Retry Driver mode: drain `not_uploaded`
    /// and `failed_report` once, then exit.
    #[arg(long, alias = "retry_failed")]
    pub retry_failed: bool,

    /// Base URL of the dispatch coordinator.
    #[arg(long, env = "SERVER_URL", default_value = "http://127.0.0.1:8000")]
    pub server_url: String,

    /// Enable HTTP Basic auth on requests to the coordinator.
    #[arg(long, env = "AUTH_ENABLED", default_value_t = false)]
    pub auth_enabled: bool,

    #[arg(long, env = "USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "PASSWORD")]
    pub password: Option<String>,

    /// Cron expression selecting processing windows. Absent means the
    /// worker loop runs continuously.
    #[arg(long, env = "CRON")]
    pub cron: Option<String>,

    /// Maximum duration, in hours, of one processing window. `<= 0`
    /// means unlimited (run until interrupted).
    #[arg(long, env = "PROCESSING_HOURS", default_value_t = 1.0)]
    pub processing_hours: f64,

    #[arg(long, env = "VAD_ENABLED", default_value_t = false)]
    pub vad_enabled: bool,

    #[arg(long, env = "VAD_MODEL")]
    pub vad_model: Option<String>,

    /// Identifies this worker in operator notifications.
    #[arg(long, env = "NODE_NAME", default_value = "worker")]
    pub node_name: String,

    #[arg(long, env = "GOTIFY_URL")]
    pub gotify_url: Option<String>,

    #[arg(long, env = "GOTIFY_KEY")]
    pub gotify_key: Option<String>,

    /// Path to the transcription engine binary (whisper.cpp-compatible).
    #[arg(long, env = "WHISPER_BIN", default_value = "./main")]
    pub whisper_bin: PathBuf,

    /// Path to the transcription model file.
    #[arg(long, env = "WHISPER_MODEL", default_value = "./models/ggml-medium.bin")]
    pub whisper_model: PathBuf,

    /// Scratch directory for `<task_id>.mp3` / `<task_id>.wav`.
    #[arg(long, env = "SCRATCH_DIR", default_value = ".")]
    pub scratch_dir: PathBuf,

    /// Working directory for the three durability bins and `processed.csv`.
    #[arg(long, env = "WORK_DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// `T_idle`: sleep between polls when the coordinator has no task.
    #[arg(long, env = "T_IDLE_SECS", default_value_t = 10)]
    pub idle_secs: u64,

    /// `T_retry`: delay between `POST /result` attempts.
    #[arg(long, env = "T_RETRY_SECS", default_value_t = 5)]
    pub retry_secs: u64,
}

impl Config {
    pub fn basic_auth(&self) -> Option<(String, String)> {
        if !self.auth_enabled {
            return None;
        }
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        }
    }

    pub fn gotify(&self) -> Option<(&str, &str)> {
        match (&self.gotify_url, &self.gotify_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }
}
