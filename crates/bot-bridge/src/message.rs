//! Text of pushes and command replies.

use bot_api::{LinkButton, SendMessageParams};
use chrono::{DateTime, Utc};

/// Longest message excerpt included in a push, in characters.
pub const EXCERPT_LIMIT: usize = 200;

pub const ANONYMOUS_VISITOR: &str = "Anonymous";
pub const OPEN_BUTTON_TEXT: &str = "Open conversation";

pub(crate) const REPLY_USAGE: &str = "Use the command in the format: /start CONNECT_CODE";
pub(crate) const REPLY_INVALID_CODE: &str = "Invalid connect code";
pub(crate) const REPLY_SUBSCRIBED: &str = "You are now subscribed to new chat notifications!";

/// Content of a new-visitor-message push.
#[derive(Debug, Clone)]
pub struct VisitorPush<'a> {
    pub conversation_id: &'a str,
    pub visitor_name: Option<&'a str>,
    pub text: Option<&'a str>,
    pub site_label: &'a str,
    /// RFC 3339 timestamp of the message.
    pub sent_at: Option<&'a str>,
}

impl VisitorPush<'_> {
    pub fn render(&self) -> String {
        let visitor = self
            .visitor_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_VISITOR);
        let text = self
            .text
            .map(excerpt)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "(no text)".to_string());

        format!(
            "🆕 New chat!\n\n👤 Visitor: {}\n💬 Message: \"{}\"\n🌐 Site: {}\n⏰ {}",
            visitor,
            text,
            self.site_label,
            clock_time(self.sent_at)
        )
    }

    /// Message params for one subscriber, with the admin panel link button.
    pub fn to_params(&self, account_ref: &str, admin_panel_url: &str) -> SendMessageParams {
        let url = format!(
            "{}/chats/{}",
            admin_panel_url.trim_end_matches('/'),
            self.conversation_id
        );
        SendMessageParams::text(account_ref, self.render())
            .with_link_button(LinkButton::new(OPEN_BUTTON_TEXT, url))
    }
}

/// First `EXCERPT_LIMIT` characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= EXCERPT_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_LIMIT).collect();
    cut.push('…');
    cut
}

/// `HH:MM` (UTC) of an RFC 3339 timestamp, or of now when absent or unparsable.
fn clock_time(timestamp: Option<&str>) -> String {
    let at = timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    at.format("%H:%M").to_string()
}
