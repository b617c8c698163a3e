use secrecy::{ExposeSecret, SecretString};
use std::env;

use crate::MailError;

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Which backend a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Plain SMTP relay.
    Smtp,
    /// Resend HTTP API (used when the SMTP host points at resend.com).
    Resend,
}

/// Configuration for the outbound mail transport.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP host
    pub host: String,
    /// SMTP port (default: 587)
    pub port: u16,
    /// Implicit TLS instead of STARTTLS
    pub secure: bool,
    /// SMTP username
    pub username: Option<String>,
    /// SMTP password, or the API key for Resend
    password: Option<SecretString>,
    /// Sender address (default: the username)
    pub from: Option<String>,
}

impl MailConfig {
    /// Create a new configuration with explicit values.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
            username: None,
            password: None,
            from: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `SMTP_HOST` is unset, meaning mail is not
    /// configured and sends are skipped.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `SMTP_HOST` | SMTP host, or `smtp.resend.com` for the Resend API | (none) |
    /// | `SMTP_PORT` | SMTP port | `587` |
    /// | `SMTP_SECURE` | `true` for implicit TLS | `false` |
    /// | `SMTP_USER` | SMTP username | (none) |
    /// | `SMTP_PASS` | SMTP password / Resend API key | (none) |
    /// | `SMTP_FROM` | Sender address | `SMTP_USER` |
    pub fn from_env() -> Result<Option<Self>, MailError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`MailConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, MailError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(host) = non_empty("SMTP_HOST") else {
            return Ok(None);
        };

        let port = match non_empty("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| MailError::Config(format!("Invalid SMTP_PORT: {}", e)))?,
            None => DEFAULT_SMTP_PORT,
        };

        let secure = non_empty("SMTP_SECURE").is_some_and(|v| v.trim() == "true");

        Ok(Some(Self {
            host,
            port,
            secure,
            username: non_empty("SMTP_USER"),
            password: non_empty("SMTP_PASS").map(SecretString::from),
            from: non_empty("SMTP_FROM"),
        }))
    }

    /// Backend this configuration selects.
    pub fn provider(&self) -> Provider {
        if self.host.contains("resend.com") {
            Provider::Resend
        } else {
            Provider::Smtp
        }
    }

    /// Sender address: `from` if set, otherwise the username.
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }

    /// Get the password (exposes the secret).
    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Builder method to set the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Builder method to enable implicit TLS.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}
