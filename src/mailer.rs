//! Outbound email collaborator.
//!
//! Flows that emit confirmation or reset tokens hand them to a [`Mailer`]
//! and move on; delivery is fire-and-forget from the flow's perspective.
//! When no mailer is configured the state holds `None` and operations that
//! require delivery surface `EmailDisabled` instead of crashing.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    ConfirmEmail,
    PasswordReset,
}

impl MailKind {
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::ConfirmEmail => "confirm_email",
            Self::PasswordReset => "password_reset",
        }
    }
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a tokenized message or return an error (logged by callers).
    async fn send(&self, kind: MailKind, recipient: &str, token: &str) -> Result<()>;
}

/// Local-dev sender that logs instead of delivering.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, kind: MailKind, recipient: &str, token: &str) -> Result<()> {
        info!(
            template = kind.template(),
            recipient = %recipient,
            token = %token,
            "mail send stub"
        );
        Ok(())
    }
}

/// Sender that posts to an HTTP mail relay (Mailgun-style JSON endpoint).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, sender: String, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .user_agent("Facegate/1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build mail relay client: {e}"))?;

        Ok(Self {
            client,
            endpoint,
            sender,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, kind: MailKind, recipient: &str, token: &str) -> Result<()> {
        let body = serde_json::json!({
            "from": self.sender,
            "to": recipient,
            "template": kind.template(),
            "token": token,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Mail relay request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Mail relay returned {}", response.status());
        }

        Ok(())
    }
}

/// Build the configured mailer, or `None` when email delivery is disabled.
pub fn from_config(config: &EmailConfig) -> Result<Option<Arc<dyn Mailer>>> {
    if !config.enabled {
        return Ok(None);
    }

    match config.provider.as_str() {
        "log" => Ok(Some(Arc::new(LogMailer))),
        "http" => {
            if config.relay_endpoint.is_empty() {
                anyhow::bail!("[email].relay_endpoint must be set for the http provider");
            }
            Ok(Some(Arc::new(HttpMailer::new(
                config.relay_endpoint.clone(),
                config.sender.clone(),
                config.request_timeout_seconds,
            )?)))
        }
        other => anyhow::bail!("Unknown [email].provider: {other} (expected \"log\" or \"http\")"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        assert!(
            mailer
                .send(MailKind::ConfirmEmail, "bob@x.com", "tok")
                .await
                .is_ok()
        );
    }

    #[test]
    fn disabled_config_yields_no_mailer() {
        let config = EmailConfig {
            enabled: false,
            ..EmailConfig::default()
        };
        assert!(from_config(&config).unwrap().is_none());
    }

    #[test]
    fn http_provider_requires_endpoint() {
        let config = EmailConfig {
            enabled: true,
            provider: "http".to_string(),
            relay_endpoint: String::new(),
            ..EmailConfig::default()
        };
        assert!(from_config(&config).is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmailConfig {
            enabled: true,
            provider: "carrier-pigeon".to_string(),
            ..EmailConfig::default()
        };
        assert!(from_config(&config).is_err());
    }
}
