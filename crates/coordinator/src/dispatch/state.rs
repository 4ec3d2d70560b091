// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use td_core::SystemClock;
use td_storage::TaskStore;

use crate::audit::AuditLog;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    pub audit: Arc<AuditLog>,
    pub clock: SystemClock,
    pub lease_secs: u64,
    pub k_attempts: u32,
    pub chunk_size: usize,
}

impl AppState {
    pub fn new(store: Arc<TaskStore>, config: &Config) -> Self {
        let audit = Arc::new(AuditLog::new(config.log_dir.join("processed.csv")));
        Self {
            store,
            audit,
            clock: SystemClock,
            lease_secs: config.lease_secs,
            k_attempts: config.k_attempts,
            chunk_size: 8192,
        }
    }
}
