// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fuel-Tracker API Server
//!
//! Serves station prices, favorites and price alerts, and runs the
//! scheduled price update that emails users when their alerts fire.

use fuel_tracker::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, Store},
    services::{scheduler, LogNotifier, Notifier, SmtpNotifier, Trigger},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Fuel-Tracker API");

    let db: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(mail) => Arc::new(SmtpNotifier::new(mail)?),
        None => {
            tracing::warn!("EMAIL_USER not set; price alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db, notifier));

    // Price scheduler runs alongside the HTTP server until shutdown.
    let cancel = CancellationToken::new();
    let scheduler_handle = if config.scheduler_enabled {
        let pipeline = state.pipeline.clone();
        let token = cancel.clone();
        Some(tokio::spawn(async move {
            scheduler::run(pipeline, Trigger::defaults(), token).await;
        }))
    } else {
        tracing::info!("Price scheduler disabled");
        None
    };

    // Build router
    let app = fuel_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(handle) = scheduler_handle {
        // A tick in progress is allowed to finish.
        if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
            tracing::warn!("Price scheduler did not stop in time");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fuel_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
