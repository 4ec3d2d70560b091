// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use td_worker::audit::WorkerAuditLog;
use td_worker::client::DispatchClient;
use td_worker::durability::DurabilityBins;
use td_worker::notify::{GotifyNotifyAdapter, NoopNotifyAdapter, NotifyAdapter};
use td_worker::pipeline::{
    FfmpegTranscoder, FfprobeDecoder, TranscribeOptions, WhisperTranscriber, WorkerLoop,
};
use td_worker::schedule::Scheduler;
use td_worker::{signal, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = DispatchClient::new(config.server_url.clone(), config.basic_auth());
    let bins = Arc::new(DurabilityBins::ensure(&config.work_dir)?);
    let notify: Arc<dyn NotifyAdapter> = match config.gotify() {
        Some((url, key)) => Arc::new(GotifyNotifyAdapter::new(url, key, config.node_name.clone())),
        None => Arc::new(NoopNotifyAdapter),
    };

    if config.retry_failed {
        info!("starting retry driver pass");
        let driver = td_worker::retry::RetryDriver::new(
            client,
            bins,
            notify,
            Duration::from_secs(config.retry_secs),
        );
        let summary = driver.run().await?;
        info!(
            uploaded = summary.uploaded,
            still_not_uploaded = summary.still_not_uploaded,
            reports_cleared = summary.reports_cleared,
            still_failed_report = summary.still_failed_report,
            "retry driver pass complete",
        );
        return Ok(());
    }

    let audit = Arc::new(WorkerAuditLog::new(config.work_dir.join("processed.csv")));
    let transcribe_opts = TranscribeOptions {
        whisper_bin: config.whisper_bin.clone(),
        whisper_model: config.whisper_model.clone(),
        vad_enabled: config.vad_enabled,
        vad_model: config.vad_model.clone().map(std::path::PathBuf::from),
        ..TranscribeOptions::default()
    };

    let worker_loop = WorkerLoop::new(
        client,
        Arc::new(FfprobeDecoder::default()),
        Arc::new(FfmpegTranscoder::default()),
        Arc::new(WhisperTranscriber::default()),
        bins,
        audit,
        notify,
        transcribe_opts,
        config.scratch_dir.clone(),
        Duration::from_secs(config.idle_secs),
        Duration::from_secs(config.retry_secs),
    );

    let interrupted = signal::install();

    info!(
        server_url = %config.server_url,
        scratch_dir = %config.scratch_dir.display(),
        work_dir = %config.work_dir.display(),
        "starting worker loop",
    );

    match &config.cron {
        Some(expression) => {
            let scheduler = Scheduler::new(expression, config.processing_hours)?;
            loop {
                if interrupted.is_set() {
                    break;
                }
                let wait = scheduler.time_until_next_fire()?;
                info!(?wait, "sleeping until next processing window");
                tokio::time::sleep(wait).await;
                if interrupted.is_set() {
                    break;
                }

                let window = scheduler.window_check();
                info!("processing window opened");
                worker_loop.run(&interrupted, || window.timed_out()).await;
                info!("processing window closed");
            }
        }
        None => {
            worker_loop.run(&interrupted, || false).await;
        }
    }

    warn!("worker exiting");
    Ok(())
}
