use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

use crate::{Email, MailConfig, MailError, SendStatus};

/// Client for sending emails over SMTP.
///
/// Uses connection pooling for efficient batch sending.
pub struct SmtpClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from_address = config
            .sender()
            .ok_or_else(|| MailError::Config("SMTP_FROM or SMTP_USER is required".to_string()))?
            .to_string();

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?
        .port(config.port);

        let transport = match (config.username.as_ref(), config.password()) {
            (Some(user), Some(pass)) => builder
                .credentials(Credentials::new(user.clone(), pass.to_string()))
                .build(),
            _ => builder.build(),
        };

        info!(
            host = %config.host,
            port = config.port,
            secure = config.secure,
            "Created SMTP client"
        );

        Ok(Self {
            transport,
            from_address,
        })
    }

    /// Send an email.
    #[instrument(skip(self, email), fields(to = ?email.to, subject = %email.subject))]
    pub async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        let message = build_message(&self.from_address, email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        let id = response.message().next().map(str::to_string);
        info!(to = ?email.to, subject = %email.subject, "Email sent successfully");
        Ok(SendStatus::Sent { id })
    }
}

/// Build a lettre Message from our Email type.
pub(crate) fn build_message(from: &str, email: &Email) -> Result<Message, MailError> {
    if email.to.is_empty() {
        return Err(MailError::NoRecipients);
    }

    let from: Mailbox = from
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("From: {}", e)))?;

    let mut builder = Message::builder().from(from).subject(&email.subject);

    for to in &email.to {
        let addr = to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("To '{}': {}", to, e)))?;
        builder = builder.to(addr);
    }

    if let Some(reply_to) = email.deliverable_reply_to() {
        let addr = reply_to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("Reply-To '{}': {}", reply_to, e)))?;
        builder = builder.reply_to(addr);
    }

    let message = if let Some(html) = &email.html_body {
        builder.multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(email.body.clone()))
                .singlepart(SinglePart::html(html.clone())),
        )
    } else {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
    };

    message.map_err(|e| MailError::BuildEmail(e.to_string()))
}
