// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry Driver (spec.md §4.5): a one-shot pass, entered via
//! `--retry-failed`, that drains the `not_uploaded` and `failed_report`
//! bins. Idempotent (P4) — running it twice back-to-back against a
//! reachable coordinator leaves the filesystem identical to running it
//! once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::client::DispatchClient;
use crate::durability::DurabilityBins;
use crate::notify::NotifyAdapter;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetrySummary {
    pub uploaded: u64,
    pub still_not_uploaded: u64,
    pub reports_cleared: u64,
    pub still_failed_report: u64,
}

pub struct RetryDriver {
    client: DispatchClient,
    bins: Arc<DurabilityBins>,
    notify: Arc<dyn NotifyAdapter>,
    retry_delay: Duration,
}

impl RetryDriver {
    pub fn new(client: DispatchClient, bins: Arc<DurabilityBins>, notify: Arc<dyn NotifyAdapter>, retry_delay: Duration) -> Self {
        Self { client, bins, notify, retry_delay }
    }

    pub async fn run(&self) -> std::io::Result<RetrySummary> {
        let mut summary = RetrySummary::default();
        self.drain_not_uploaded(&mut summary).await?;
        self.drain_failed_report(&mut summary).await?;
        Ok(summary)
    }

    /// Pass 1: for each `.vtt` in `not_uploaded/`, attempt `POST /result`
    /// up to 3 times with `T_retry` gaps. On success: move to
    /// `uploaded/`, clear any matching `failed_report` marker. On
    /// failure: emit `POST /error` (also up to 3 attempts) and, if that
    /// also fails, ensure a marker exists.
    async fn drain_not_uploaded(&self, summary: &mut RetrySummary) -> std::io::Result<()> {
        for (task_id, vtt_path) in self.bins.list_not_uploaded()? {
            let vtt_text = match std::fs::read_to_string(&vtt_path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%task_id, error = %e, "could not read not_uploaded artifact, skipping");
                    summary.still_not_uploaded += 1;
                    continue;
                }
            };

            let mut uploaded = false;
            for attempt in 1..=MAX_ATTEMPTS {
                match self.client.post_result(&task_id, &vtt_text).await {
                    Ok(true) => {
                        uploaded = true;
                        break;
                    }
                    Ok(false) => break, // reassigned; retrying would just 404 again
                    Err(e) => warn!(%task_id, attempt, error = %e, "retry upload attempt failed"),
                }
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(self.retry_delay).await;
                }
            }

            if uploaded {
                self.bins.move_to_uploaded(&vtt_path, &task_id)?;
                self.bins.clear_failed_report(&task_id)?;
                summary.uploaded += 1;
                info!(%task_id, "retry driver uploaded previously-stuck artifact");
                continue;
            }

            summary.still_not_uploaded += 1;
            let reported = self.report_error(&task_id, "retry driver: upload still failing").await;
            if !reported {
                self.bins.mark_failed_report(&task_id)?;
            }
        }
        Ok(())
    }

    /// Pass 2: for each marker in `failed_report/`, attempt `POST /error`
    /// up to 3 times. On success: delete the marker. On failure: notify
    /// and leave in place for the next run.
    async fn drain_failed_report(&self, summary: &mut RetrySummary) -> std::io::Result<()> {
        for task_id in self.bins.list_failed_report()? {
            let reported = self.report_error(&task_id, "retry driver: error report still owed").await;
            if reported {
                self.bins.clear_failed_report(&task_id)?;
                summary.reports_cleared += 1;
                info!(%task_id, "retry driver cleared failed_report marker");
            } else {
                summary.still_failed_report += 1;
                self.notify
                    .notify_best_effort(
                        "error report still undelivered",
                        &format!("task {task_id} could not be reported to the coordinator"),
                    )
                    .await;
            }
        }
        Ok(())
    }

    async fn report_error(&self, task_id: &str, reason: &str) -> bool {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.post_error(task_id, Some(reason)).await {
                Ok(found) => return found,
                Err(e) => warn!(%task_id, attempt, error = %e, "error report attempt failed"),
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        false
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
