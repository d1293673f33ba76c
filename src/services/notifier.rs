// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price alert notifications.
//!
//! One email per user per evaluation pass, listing every alert that fired.
//! [`SmtpNotifier`] sends through a relay with the configured mail account;
//! [`LogNotifier`] is used when no mail account is configured.

use crate::config::MailConfig;
use crate::models::{FuelType, User};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// One fired alert, as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub alert_id: String,
    pub station_name: String,
    pub address: String,
    pub fuel_type: FuelType,
    pub current_price: f64,
    pub target_price: f64,
}

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Delivers alert summaries to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &User, alerts: &[TriggeredAlert]) -> Result<(), MailError>;
}

pub fn render_subject(alerts: &[TriggeredAlert]) -> String {
    if alerts.len() == 1 {
        format!(
            "Fuel price alert: {} at {}",
            alerts[0].fuel_type.label(),
            alerts[0].station_name
        )
    } else {
        format!("Fuel price alerts: {} stations hit your target", alerts.len())
    }
}

/// Plain-text body listing every triggered alert.
pub fn render_body(user: &User, alerts: &[TriggeredAlert]) -> String {
    let mut body = format!(
        "Hello {},\n\nPrices dropped to your target at the following stations:\n\n",
        user.first_name
    );
    for alert in alerts {
        body.push_str(&format!(
            "- {} ({})\n  {}: {:.2} (your target: {:.2})\n",
            alert.station_name,
            alert.address,
            alert.fuel_type.label(),
            alert.current_price,
            alert.target_price
        ));
    }
    body.push_str("\nYou can manage your alerts in the app.\n");
    body
}

/// Sends alert emails over SMTP (STARTTLS) with account credentials.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Build the transport once; it is reused for every send.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();

        tracing::info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            "SMTP notifier initialized"
        );

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, user: &User, alerts: &[TriggeredAlert]) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(user.email.parse()?)
            .subject(render_subject(alerts))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(user, alerts))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(email).await?;

        tracing::info!(
            user_id = %user.id,
            alerts = alerts.len(),
            "Price alert email sent"
        );
        Ok(())
    }
}

/// Logs alerts instead of mailing them (no mail account configured).
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user: &User, alerts: &[TriggeredAlert]) -> Result<(), MailError> {
        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            alerts = alerts.len(),
            subject = %render_subject(alerts),
            "Mail not configured; price alert logged only"
        );
        Ok(())
    }
}
