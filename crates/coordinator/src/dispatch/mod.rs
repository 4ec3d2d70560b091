// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch API: `GET /task`, `POST /result`, `POST /error`.

mod handlers;
mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/task", get(handlers::get_task))
        .route("/result", post(handlers::post_result))
        .route("/error", post(handlers::post_error))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
