// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything the server and the price pipeline need is read once at
//! startup into a [`Config`] and passed down explicitly.

use std::env;

/// Default outbound mail relay (STARTTLS).
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Outbound mail settings. Present only when credentials are configured.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Mail account user (also the default sender)
    pub user: String,
    pub password: String,
    pub from_address: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Run the background price scheduler
    pub scheduler_enabled: bool,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret for `/tasks/*` callers; `None` disables those routes
    pub tasks_token: Option<String>,
    /// Mail transport; `None` means alerts are logged instead of mailed
    pub mail: Option<MailConfig>,
}

impl Config {
    /// Config for tests: in-memory store, no mail, no scheduler.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            scheduler_enabled: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            tasks_token: Some("test_tasks_token".to_string()),
            mail: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(true),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            tasks_token: env::var("TASKS_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            mail: mail_from_env()?,
        })
    }
}

/// Mail settings are optional, but half-configured credentials are an error.
fn mail_from_env() -> Result<Option<MailConfig>, ConfigError> {
    let user = env::var("EMAIL_USER").ok().filter(|v| !v.is_empty());
    let password = env::var("EMAIL_PASSWORD").ok().filter(|v| !v.is_empty());

    match (user, password) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing("EMAIL_PASSWORD")),
        (None, Some(_)) => Err(ConfigError::Missing("EMAIL_USER")),
        (Some(user), Some(password)) => Ok(Some(MailConfig {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: env::var("EMAIL_FROM").unwrap_or_else(|_| user.clone()),
            user,
            password: password.trim().to_string(),
        })),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so env mutations don't race with each other.
    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("SCHEDULER_ENABLED", "false");
        env::remove_var("EMAIL_USER");
        env::remove_var("EMAIL_PASSWORD");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(!config.scheduler_enabled);
        assert!(config.mail.is_none());
        assert_eq!(config.port, 8080);

        env::set_var("EMAIL_USER", "alerts@example.com");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("EMAIL_PASSWORD")));

        env::set_var("EMAIL_PASSWORD", "app-password");
        let config = Config::from_env().expect("Config should load");
        let mail = config.mail.expect("mail configured");
        assert_eq!(mail.smtp_host, DEFAULT_SMTP_HOST);
        assert_eq!(mail.from_address, "alerts@example.com");

        env::set_var("STORE_BACKEND", "postgres");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::Invalid("STORE_BACKEND")
        ));

        env::remove_var("EMAIL_USER");
        env::remove_var("EMAIL_PASSWORD");
        env::remove_var("STORE_BACKEND");
        env::remove_var("SCHEDULER_ENABLED");
    }
}
