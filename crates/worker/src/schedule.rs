// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional time-windowed gate around the worker loop (spec.md §4.6).
//! Given a cron expression and a `PROCESSING_HOURS` budget: compute the
//! next fire time, sleep until then, run the worker loop with a
//! `check_timeout` predicate that flips true once elapsed exceeds the
//! budget, then loop to the next fire time. Absent a cron expression the
//! caller runs the worker loop continuously instead of consulting this
//! module at all.

use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::Utc;
use cron::Schedule;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {0:?}: {1}")]
    InvalidExpression(String, String),

    #[error("cron expression {0:?} has no future fire time")]
    NoFutureFireTime(String),
}

pub struct Scheduler {
    schedule: Schedule,
    expression: String,
    processing_hours: f64,
}

impl Scheduler {
    pub fn new(expression: &str, processing_hours: f64) -> Result<Self, ScheduleError> {
        let schedule = Schedule::from_str(expression)
            .map_err(|e| ScheduleError::InvalidExpression(expression.to_string(), e.to_string()))?;
        Ok(Self { schedule, expression: expression.to_string(), processing_hours })
    }

    /// How long to sleep before the next processing window starts.
    pub fn time_until_next_fire(&self) -> Result<Duration, ScheduleError> {
        let now = Utc::now();
        let next = self
            .schedule
            .after(&now)
            .next()
            .ok_or_else(|| ScheduleError::NoFutureFireTime(self.expression.clone()))?;
        Ok((next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// `<= 0.0` means "no budget": the window never times out on its own
    /// (the original's `PROCESSING_HOURS > 0` guard in `check_timeout`).
    pub fn has_budget(&self) -> bool {
        self.processing_hours > 0.0
    }

    pub fn budget(&self) -> Option<Duration> {
        self.has_budget().then(|| Duration::from_secs_f64(self.processing_hours * 3600.0))
    }

    /// A `check_timeout` predicate bound to a window that starts now.
    pub fn window_check(&self) -> WindowCheck {
        WindowCheck { start: Instant::now(), budget: self.budget() }
    }
}

/// Returns `true` once the window's budget has elapsed. A window with no
/// budget (`has_budget() == false`) never times out.
#[derive(Clone, Copy)]
pub struct WindowCheck {
    start: Instant,
    budget: Option<Duration>,
}

impl WindowCheck {
    pub fn timed_out(&self) -> bool {
        match self.budget {
            Some(budget) => self.start.elapsed() >= budget,
            None => false,
        }
    }
}
