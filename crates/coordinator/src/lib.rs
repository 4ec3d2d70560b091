// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch coordinator: the authoritative task table, the HTTP API
//! workers poll, and the background reconciler that keeps the table in
//! sync with the audio tree on disk.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod logging;

pub use config::Config;
pub use error::DispatchError;
