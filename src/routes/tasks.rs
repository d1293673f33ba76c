// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Internal task routes.
//!
//! Called by an external cron or an operator, not by users. Protected by
//! the shared tasks token (see `middleware::tasks_auth`).

use crate::services::TickReport;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

/// Task routes. The tasks-token middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/update-prices", post(update_prices))
}

/// Run one price tick now and report what it did.
///
/// Waits for a scheduled tick already in progress.
async fn update_prices(State(state): State<Arc<AppState>>) -> Json<TickReport> {
    tracing::info!("On-demand price tick requested");
    Json(state.pipeline.run_tick("on-demand").await)
}
