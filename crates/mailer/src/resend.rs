use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{Email, MailConfig, MailError, SendStatus};

/// Default Resend API base URL.
pub const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

/// Client for the Resend HTTP email API.
pub struct ResendClient {
    http: Client,
    base_url: String,
    api_key: String,
    from_address: String,
}

impl ResendClient {
    /// Create a client from a mail configuration. The SMTP password is the API key.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let api_key = config
            .password()
            .ok_or_else(|| MailError::Config("SMTP_PASS (Resend API key) is required".to_string()))?
            .to_string();
        let from_address = config
            .sender()
            .ok_or_else(|| MailError::Config("SMTP_FROM is required for Resend".to_string()))?
            .to_string();

        Ok(Self {
            http: Client::new(),
            base_url: RESEND_API_BASE.to_string(),
            api_key,
            from_address,
        })
    }

    /// Point the client at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send an email through the API.
    #[instrument(skip(self, email), fields(to = ?email.to, subject = %email.subject))]
    pub async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let body = ResendRequest {
            from: &self.from_address,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
            html: email.html_body.as_deref(),
            reply_to: email.deliverable_reply_to(),
        };

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Send(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::Send(format!("Resend returned {}: {}", status, text)));
        }

        let parsed: ResendResponse = response
            .json()
            .await
            .map_err(|e| MailError::Send(e.without_url().to_string()))?;

        info!(to = ?email.to, id = ?parsed.id, "Email sent via Resend");
        Ok(SendStatus::Sent { id: parsed.id })
    }
}
