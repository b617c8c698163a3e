use async_trait::async_trait;
use tracing::warn;

use crate::{Email, MailConfig, MailError, Provider, ResendClient, SendStatus, SmtpClient};

/// Anything that can deliver an [`Email`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &Email) -> Result<SendStatus, MailError>;
}

#[async_trait]
impl MailTransport for SmtpClient {
    async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        SmtpClient::send(self, email).await
    }
}

#[async_trait]
impl MailTransport for ResendClient {
    async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        ResendClient::send(self, email).await
    }
}

/// Mail sender that picks its backend from configuration.
///
/// When no backend is configured every send is a logged no-op returning
/// [`SendStatus::Skipped`].
pub struct Mailer {
    backend: Option<Box<dyn MailTransport>>,
}

impl Mailer {
    /// Build a mailer for the given configuration.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let backend: Box<dyn MailTransport> = match config.provider() {
            Provider::Resend => Box::new(ResendClient::new(config)?),
            Provider::Smtp => Box::new(SmtpClient::new(config)?),
        };
        Ok(Self {
            backend: Some(backend),
        })
    }

    /// Build from `SMTP_*` environment variables; unconfigured if `SMTP_HOST` is unset.
    pub fn from_env() -> Result<Self, MailError> {
        match MailConfig::from_env()? {
            Some(config) => Self::new(&config),
            None => Ok(Self::unconfigured()),
        }
    }

    /// A mailer that skips every send.
    pub fn unconfigured() -> Self {
        Self { backend: None }
    }

    /// Wrap an existing transport.
    pub fn with_transport(transport: impl MailTransport + 'static) -> Self {
        Self {
            backend: Some(Box::new(transport)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }
}

#[async_trait]
impl MailTransport for Mailer {
    async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        match &self.backend {
            Some(backend) => backend.send(email).await,
            None => {
                warn!(to = ?email.to, subject = %email.subject, "SMTP not configured, email skipped");
                Ok(SendStatus::Skipped)
            }
        }
    }
}
