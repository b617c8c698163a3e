/// An email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Primary recipients
    pub to: Vec<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Optional HTML body
    pub html_body: Option<String>,
    /// Address replies should go to
    pub reply_to: Option<String>,
}

impl Email {
    /// Create a new email with a single recipient.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new_multi([to.into()], subject, body)
    }

    /// Create a new email with multiple recipients.
    pub fn new_multi(
        to: impl IntoIterator<Item = impl Into<String>>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            body: body.into(),
            html_body: None,
            reply_to: None,
        }
    }

    /// Set the HTML body (creates multipart alternative with text fallback).
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Set the Reply-To address.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// The Reply-To address if it parses; an invalid one is dropped with a
    /// warning rather than failing the send.
    pub fn deliverable_reply_to(&self) -> Option<&str> {
        let reply_to = self.reply_to.as_deref()?;
        if is_valid_address(reply_to) {
            Some(reply_to)
        } else {
            tracing::warn!(reply_to, "Dropping unparseable Reply-To address");
            None
        }
    }
}

/// Whether `address` is a bare email address the transports accept.
pub fn is_valid_address(address: &str) -> bool {
    address.parse::<lettre::Address>().is_ok()
}

/// Outcome of a send attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Handed to the provider; carries the provider message ID when known.
    Sent { id: Option<String> },
    /// No transport configured; nothing was sent.
    Skipped,
}
