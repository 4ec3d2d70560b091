// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable lease expiry and reconciliation timing.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the current wall-clock time as Unix seconds.
///
/// All lease arithmetic in `td-storage` goes through this trait so tests
/// can advance time deterministically instead of sleeping.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_unix_secs(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Fake clock for tests with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_unix_secs: u64) -> Self {
        Self { now: Arc::new(Mutex::new(start_unix_secs)) }
    }

    pub fn advance(&self, secs: u64) {
        *self.now.lock() += secs;
    }

    pub fn set(&self, unix_secs: u64) {
        *self.now.lock() = unix_secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for FakeClock {
    fn now_unix_secs(&self) -> u64 {
        *self.now.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
