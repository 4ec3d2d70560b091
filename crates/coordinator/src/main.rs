// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use td_coordinator::dispatch::{router, AppState};
use td_coordinator::{lifecycle, logging, Config};
use td_core::SystemClock;
use td_storage::TaskStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _log_guard = logging::init(&config.log_dir)?;

    info!(
        audio_dir = %config.audio_dir.display(),
        db_file = %config.db_file.display(),
        bind_addr = %config.bind_addr,
        "starting dispatch coordinator",
    );

    let store = Arc::new(TaskStore::open(&config.db_file)?);
    let clock = SystemClock;

    // Startup: one synchronous reconciliation pass before the dispatch API
    // accepts requests (spec.md §4.2).
    let counts = lifecycle::reconcile_once(&store, &config.audio_dir, &clock)?;
    info!(
        inserted = counts.inserted,
        reset = counts.reset,
        expired = counts.expired,
        "startup directory sync complete",
    );

    let reconciler_handle = tokio::spawn(lifecycle::run_periodic(
        store.clone(),
        config.audio_dir.clone(),
        clock,
        Duration::from_secs(config.sync_secs),
    ));

    let state = AppState::new(store, &config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "dispatch API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    reconciler_handle.abort();
    Ok(())
}
