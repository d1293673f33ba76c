// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication for internal `/tasks/*` routes.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the tasks token.
pub const TASKS_TOKEN_HEADER: &str = "x-tasks-token";

/// Require `x-tasks-token` to match the configured token.
///
/// With no token configured every request is refused.
pub async fn require_tasks_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.tasks_token.as_deref() else {
        tracing::warn!("Blocked tasks request: TASKS_TOKEN not configured");
        return Err(StatusCode::FORBIDDEN);
    };

    let presented = request
        .headers()
        .get(TASKS_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    if !presented.is_some_and(|token| tokens_match(token, expected)) {
        tracing::warn!(
            has_header = presented.is_some(),
            "Blocked tasks request with invalid token"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
