// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Header names used by `GET /task`.

/// 32-char lowercase hex task id, the opaque handle for this assignment.
pub const X_TASK_ID: &str = "x-task-id";

/// ISO-like language code read from the sidecar, opaque to the coordinator.
pub const X_LANGUAGE: &str = "x-language";
