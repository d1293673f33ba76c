// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod alerts;
pub mod notifier;
pub mod password;
pub mod pipeline;
pub mod price_mutator;
pub mod scheduler;
pub mod stations;

pub use alerts::{AlertEvaluator, EvaluationReport};
pub use notifier::{LogNotifier, MailError, Notifier, SmtpNotifier, TriggeredAlert};
pub use pipeline::{PricePipeline, TickReport};
pub use price_mutator::{MutationReport, PriceMutator};
pub use scheduler::Trigger;
pub use stations::StationQuery;
