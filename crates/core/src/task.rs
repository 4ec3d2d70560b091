// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task row and its lifecycle.
//!
//! Transitions: `pending -> in_progress -> {completed, failed}`;
//! `failed -> pending` only via the reconciler when the sibling artifact
//! is missing. Workers can only move a row *out* of `in_progress`, never
//! into it — claiming and reconciling are the sole producers of
//! `in_progress` and `pending` respectively.

use crate::id::TaskId;
use serde::{Deserialize, Serialize};

/// Status of a task row. See module docs for the legal transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the task table, keyed by `path`.
///
/// `task_id` is only meaningful (and only stored) while `status` is
/// `InProgress`; for every other status it is re-derived on demand via
/// [`TaskId::for_path`] rather than trusted from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub path: String,
    pub status: TaskStatus,
    pub lease_expiry: Option<u64>,
    pub assignee: Option<String>,
    pub task_id: Option<TaskId>,
}

impl TaskRow {
    pub fn new_pending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: TaskStatus::Pending,
            lease_expiry: None,
            assignee: None,
            task_id: None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
