// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The price tick: mutate station prices, then evaluate alerts.
//!
//! Ticks are serialized. If a trigger fires while a tick is running it waits
//! for the running one to finish, so two passes never interleave their
//! station writes.

use crate::services::alerts::{AlertEvaluator, EvaluationReport};
use crate::services::price_mutator::{MutationReport, PriceMutator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-tick outcome summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TickReport {
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub stations_updated: u32,
    pub stations_failed: u32,
    pub users_evaluated: u32,
    pub alerts_triggered: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    pub users_failed: u32,
}

impl TickReport {
    fn new(trigger: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger: trigger.to_string(),
            started_at,
            ..Default::default()
        }
    }

    fn with_mutation(mut self, m: MutationReport) -> Self {
        self.stations_updated = m.stations_updated;
        self.stations_failed = m.stations_failed;
        self
    }

    fn with_evaluation(mut self, e: EvaluationReport) -> Self {
        self.users_evaluated = e.users_evaluated;
        self.alerts_triggered = e.alerts_triggered;
        self.notifications_sent = e.notifications_sent;
        self.notifications_failed = e.notifications_failed;
        self.users_failed = e.users_failed;
        self
    }

    pub fn has_failures(&self) -> bool {
        self.stations_failed > 0 || self.notifications_failed > 0 || self.users_failed > 0
    }
}

/// Owns the mutator and evaluator and runs them as one tick.
pub struct PricePipeline {
    mutator: PriceMutator,
    evaluator: AlertEvaluator,
    tick_lock: Mutex<()>,
}

impl PricePipeline {
    pub fn new(mutator: PriceMutator, evaluator: AlertEvaluator) -> Self {
        Self {
            mutator,
            evaluator,
            tick_lock: Mutex::new(()),
        }
    }

    /// Run one tick with random price draws.
    pub async fn run_tick(&self, trigger: &str) -> TickReport {
        let _guard = self.tick_lock.lock().await;
        let now = Utc::now();
        let mutation = self.mutator.run(now).await;
        self.finish_tick(trigger, now, mutation).await
    }

    /// Run one tick at `now`, drawing perturbations from `draw`.
    pub async fn run_tick_with<F>(&self, trigger: &str, now: DateTime<Utc>, draw: F) -> TickReport
    where
        F: FnMut() -> f64 + Send,
    {
        let _guard = self.tick_lock.lock().await;
        let mutation = self.mutator.run_with(now, draw).await;
        self.finish_tick(trigger, now, mutation).await
    }

    async fn finish_tick(
        &self,
        trigger: &str,
        now: DateTime<Utc>,
        mutation: MutationReport,
    ) -> TickReport {
        let evaluation = self.evaluator.run(now).await;
        let report = TickReport::new(trigger, now)
            .with_mutation(mutation)
            .with_evaluation(evaluation);

        if report.has_failures() {
            tracing::warn!(
                trigger,
                stations_updated = report.stations_updated,
                stations_failed = report.stations_failed,
                alerts_triggered = report.alerts_triggered,
                notifications_sent = report.notifications_sent,
                notifications_failed = report.notifications_failed,
                users_failed = report.users_failed,
                "Price tick finished with failures"
            );
        } else {
            tracing::info!(
                trigger,
                stations_updated = report.stations_updated,
                users_evaluated = report.users_evaluated,
                alerts_triggered = report.alerts_triggered,
                notifications_sent = report.notifications_sent,
                "Price tick finished"
            );
        }

        report
    }
}
