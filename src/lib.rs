// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fuel-Tracker: fuel station prices and price alerts
//!
//! This crate provides the backend API for browsing fuel stations, managing
//! favorites and price alerts, and the scheduled pipeline that updates
//! prices and emails users whose alerts fire.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Store;
use services::{AlertEvaluator, Notifier, PriceMutator, PricePipeline};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub pipeline: Arc<PricePipeline>,
}

impl AppState {
    /// Wire the price pipeline over `db` and bundle it with the config.
    pub fn new(config: Config, db: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let pipeline = Arc::new(PricePipeline::new(
            PriceMutator::new(db.clone()),
            AlertEvaluator::new(db.clone(), notifier),
        ));
        Self {
            config,
            db,
            pipeline,
        }
    }
}
