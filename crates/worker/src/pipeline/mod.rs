// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Loop (spec.md §4.4): poll → download → decode → transcode →
//! transcribe → upload, with the three-bin durability ladder covering
//! every failure path. The worker never surfaces an exception past one
//! task boundary — every path through [`WorkerLoop::run_iteration`] ends
//! with either a moved artifact, a marker file, or (on the happy path)
//! both an audit row and a coordinator that has moved on.

mod capability;
mod ringbuffer;

pub use capability::{
    Decoder, FfmpegTranscoder, FfprobeDecoder, TranscribeOptions, Transcoder, Transcriber,
    WhisperTranscriber,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::audit::WorkerAuditLog;
use crate::client::DispatchClient;
use crate::durability::DurabilityBins;
use crate::error::WorkerError;
use crate::notify::NotifyAdapter;
use crate::signal::InterruptFlag;

/// Outcome of one iteration, for tests and for the scheduler's logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Nothing claimable; caller should sleep `T_idle`.
    NoTask,
    Completed { task_id: String },
    Failed { task_id: String, reason: String },
}

pub struct WorkerLoop {
    client: DispatchClient,
    decoder: Arc<dyn Decoder>,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
    bins: Arc<DurabilityBins>,
    audit: Arc<WorkerAuditLog>,
    notify: Arc<dyn NotifyAdapter>,
    transcribe_opts: TranscribeOptions,
    scratch_dir: PathBuf,
    idle: Duration,
    upload_retry_delay: Duration,
}

impl WorkerLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: DispatchClient,
        decoder: Arc<dyn Decoder>,
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
        bins: Arc<DurabilityBins>,
        audit: Arc<WorkerAuditLog>,
        notify: Arc<dyn NotifyAdapter>,
        transcribe_opts: TranscribeOptions,
        scratch_dir: PathBuf,
        idle: Duration,
        upload_retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            decoder,
            transcoder,
            transcriber,
            bins,
            audit,
            notify,
            transcribe_opts,
            scratch_dir,
            idle,
            upload_retry_delay,
        }
    }

    /// Runs iterations until `interrupted` is set or `timed_out` returns
    /// true, checked only at quiescence points (after an iteration
    /// resolves, or after the idle sleep) — never mid-pipeline (spec.md
    /// §4.7).
    pub async fn run(&self, interrupted: &InterruptFlag, timed_out: impl Fn() -> bool) {
        loop {
            let outcome = self.run_iteration().await;
            if matches!(outcome, IterationOutcome::NoTask) {
                tokio::time::sleep(self.idle).await;
            }
            if interrupted.is_set() || timed_out() {
                info!("worker loop exiting at quiescence point");
                break;
            }
        }
    }

    /// One full iteration of spec.md §4.4 steps 1-8. Never returns an
    /// `Err` — every failure is resolved into an `IterationOutcome`
    /// internally, because no exception may cross a task boundary.
    pub async fn run_iteration(&self) -> IterationOutcome {
        // Named by pid, not task id: the id is only known once the
        // coordinator's response headers arrive. Renamed to
        // `<task_id>.mp3` immediately below so two workers sharing a
        // scratch dir can never collide on a final scratch name.
        let mp3_path = self.scratch_dir.join(format!("poll-{}.mp3.tmp", std::process::id()));

        let assignment = match self.client.poll_task(&mp3_path).await {
            Ok(Some(a)) => a,
            Ok(None) => return IterationOutcome::NoTask,
            Err(e) => {
                warn!(error = %e, "poll failed, will retry after idle sleep");
                let _ = tokio::fs::remove_file(&mp3_path).await;
                return IterationOutcome::NoTask;
            }
        };

        let task_id = assignment.task_id.clone();
        let final_mp3 = self.scratch_dir.join(format!("{task_id}.mp3"));
        if let Err(e) = tokio::fs::rename(&mp3_path, &final_mp3).await {
            warn!(%task_id, error = %e, "failed to stage downloaded audio");
            return IterationOutcome::Failed { task_id, reason: e.to_string() };
        }
        let wav_path = self.scratch_dir.join(format!("{task_id}.wav"));

        let outcome = self
            .drive_claimed_task(&task_id, &assignment.language, &final_mp3, &wav_path)
            .await;

        let _ = std::fs::remove_file(&final_mp3);
        let _ = std::fs::remove_file(&wav_path);

        outcome
    }

    async fn drive_claimed_task(
        &self,
        task_id: &str,
        language: &str,
        mp3_path: &std::path::Path,
        wav_path: &std::path::Path,
    ) -> IterationOutcome {
        let audio_minutes = match self.decoder.duration_secs(mp3_path).await {
            Ok(secs) => secs / 60.0,
            Err(e) => {
                self.report_preupload_failure(task_id, language, 0.0, 0.0, &e).await;
                return IterationOutcome::Failed { task_id: task_id.to_string(), reason: e.to_string() };
            }
        };

        if let Err(e) = self.transcoder.transcode(mp3_path, wav_path).await {
            self.report_preupload_failure(task_id, language, 0.0, audio_minutes, &e).await;
            return IterationOutcome::Failed { task_id: task_id.to_string(), reason: e.to_string() };
        }

        let started = Instant::now();
        let vtt_path = match self.transcriber.transcribe(wav_path, language, &self.transcribe_opts).await {
            Ok(path) => path,
            Err(e) => {
                self.report_preupload_failure(task_id, language, 0.0, audio_minutes, &e).await;
                return IterationOutcome::Failed { task_id: task_id.to_string(), reason: e.to_string() };
            }
        };
        let time_taken = started.elapsed().as_secs_f64();

        let vtt_text = match tokio::fs::read_to_string(&vtt_path).await {
            Ok(text) => text,
            Err(e) => {
                let err = WorkerError::UploadFailed(format!("could not read produced artifact: {e}"));
                self.report_postupload_failure(task_id, language, time_taken, audio_minutes, &vtt_path, &err)
                    .await;
                return IterationOutcome::Failed { task_id: task_id.to_string(), reason: err.to_string() };
            }
        };

        self.upload_or_fall_back(task_id, language, time_taken, audio_minutes, &vtt_path, &vtt_text)
            .await
    }

    /// Step 6: `POST /result` up to 3 times with `T_retry` between
    /// attempts. On first success the artifact moves to `uploaded/`; on
    /// exhaustion it falls back to the durability ladder.
    async fn upload_or_fall_back(
        &self,
        task_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        vtt_path: &std::path::Path,
        vtt_text: &str,
    ) -> IterationOutcome {
        const MAX_ATTEMPTS: u32 = 3;
        let mut last_error: Option<WorkerError> = None;
        let mut reassigned = false;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.post_result(task_id, vtt_text).await {
                Ok(true) => {
                    match self.bins.move_to_uploaded(vtt_path, task_id) {
                        Ok(_) => {
                            self.audit.record_success(task_id, language, time_taken, audio_minutes);
                            let _ = self.bins.clear_failed_report(task_id);
                            info!(%task_id, "task uploaded");
                            return IterationOutcome::Completed { task_id: task_id.to_string() };
                        }
                        Err(e) => {
                            warn!(%task_id, error = %e, "failed to move artifact into uploaded/");
                            last_error = Some(WorkerError::UploadFailed(e.to_string()));
                            break;
                        }
                    }
                }
                Ok(false) => {
                    // Lease expired and the task was reassigned; retrying
                    // `POST /result` would only ever 404 again.
                    reassigned = true;
                    break;
                }
                Err(e) => {
                    warn!(%task_id, attempt, error = %e, "upload attempt failed");
                    last_error = Some(e);
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.upload_retry_delay).await;
            }
        }

        let reason = if reassigned {
            "task reassigned before upload (lease expired)".to_string()
        } else {
            last_error.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "upload failed".to_string())
        };

        match self.bins.move_to_not_uploaded(vtt_path, task_id) {
            Ok(_) => {}
            Err(e) => warn!(%task_id, error = %e, "failed to move artifact into not_uploaded/"),
        }
        self.audit.record_failure(task_id, language, time_taken, audio_minutes, &reason);

        let reported = self.client.post_error(task_id, Some(&reason)).await.unwrap_or(false);
        if !reported {
            if let Err(e) = self.bins.mark_failed_report(task_id) {
                warn!(%task_id, error = %e, "failed to write failed_report marker");
            }
        }

        self.notify
            .notify_best_effort(
                "transcription upload failed",
                &format!("task {task_id}: {reason}"),
            )
            .await;

        IterationOutcome::Failed { task_id: task_id.to_string(), reason }
    }

    /// Steps 3-5 failures: no artifact was produced, so only the error
    /// report and an audit row are owed (spec.md §4.4 step 7, §7).
    async fn report_preupload_failure(
        &self,
        task_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        error: &WorkerError,
    ) {
        warn!(%task_id, %error, "pipeline step failed before an artifact was produced");
        self.audit.record_failure(task_id, language, time_taken, audio_minutes, &error.to_string());

        let reported = self.client.post_error(task_id, Some(&error.to_string())).await.unwrap_or(false);
        if !reported {
            if let Err(e) = self.bins.mark_failed_report(task_id) {
                warn!(%task_id, error = %e, "failed to write failed_report marker");
            }
        }

        let mut body = error.to_string();
        if let Some((stdout_tail, stderr_tail)) = error.tails() {
            if !stdout_tail.is_empty() {
                body.push_str("\n--- stdout tail ---\n");
                body.push_str(&stdout_tail.join("\n"));
            }
            if !stderr_tail.is_empty() {
                body.push_str("\n--- stderr tail ---\n");
                body.push_str(&stderr_tail.join("\n"));
            }
        }
        self.notify.notify_best_effort("transcription task failed", &body).await;
    }

    /// A failure after the engine already wrote the artifact but before
    /// it could be uploaded (here, an unreadable `.vtt`) — the artifact
    /// still exists, so it must move to `not_uploaded/` rather than be
    /// left orphaned in scratch (spec.md §4.4 step 7: "if the artifact
    /// exists ... move it to `not_uploaded/`").
    async fn report_postupload_failure(
        &self,
        task_id: &str,
        language: &str,
        time_taken: f64,
        audio_minutes: f64,
        vtt_path: &std::path::Path,
        error: &WorkerError,
    ) {
        warn!(%task_id, %error, "pipeline step failed after the artifact was produced");
        match self.bins.move_to_not_uploaded(vtt_path, task_id) {
            Ok(_) => {}
            Err(e) => warn!(%task_id, error = %e, "failed to move artifact into not_uploaded/"),
        }
        self.audit.record_failure(task_id, language, time_taken, audio_minutes, &error.to_string());

        let reported = self.client.post_error(task_id, Some(&error.to_string())).await.unwrap_or(false);
        if !reported {
            if let Err(e) = self.bins.mark_failed_report(task_id) {
                warn!(%task_id, error = %e, "failed to write failed_report marker");
            }
        }

        self.notify
            .notify_best_effort("transcription upload failed", &format!("task {task_id}: {error}"))
            .await;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
