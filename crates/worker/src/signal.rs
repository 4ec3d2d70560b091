// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful interrupt (spec.md §4.7): SIGINT/SIGTERM set a shared flag
//! rather than raising, so the worker loop can finish its in-flight task
//! and file the result durably before exiting. The loop only checks this
//! flag at its natural quiescence points — after an upload, after the
//! idle sleep — never mid-pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Installs Ctrl-C and (on Unix) SIGTERM handlers that set the returned
/// flag. The returned background task runs for the lifetime of the
/// process; dropping it stops listening but does not clear the flag.
pub fn install() -> InterruptFlag {
    let flag = InterruptFlag::new();
    let task_flag = flag.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    task_flag.set();
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("interrupt received, finishing in-flight task before exit");
        task_flag.set();
    });

    flag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_latches_once_set() {
        let flag = InterruptFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn clones_share_the_same_underlying_flag() {
        let flag = InterruptFlag::new();
        let clone = flag.clone();
        clone.set();
        assert!(flag.is_set());
    }
}
