//! Database models.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default escalation window when a tenant has not configured one.
pub const DEFAULT_FALLBACK_TIMEOUT_MINUTES: i64 = 5;

/// An operator account (site owner or invited operator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Stable account ID.
    pub id: String,
    /// Email address used for fallback notifications.
    pub email: Option<String>,
    /// Display name.
    pub name: String,
}

/// A tenant website. The ID doubles as the fanout topic and room key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Site {
    /// Opaque tenant ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Public domain (e.g., "shop.example.com").
    pub domain: Option<String>,
    /// Owning user ID.
    pub owner_id: String,
}

impl Site {
    /// Label used in notifications: the domain if set, otherwise the name.
    pub fn label(&self) -> &str {
        self.domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Per-tenant notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NotificationConfig {
    /// Owning site.
    pub site_id: String,
    /// Primary notification address.
    pub notification_email: Option<String>,
    /// Whether the delayed email fallback is armed for visitor messages.
    pub email_fallback_enabled: bool,
    /// Extra recipient for fallback emails.
    pub email_fallback_address: Option<String>,
    /// Minutes to wait before escalating (1..=60).
    pub email_fallback_timeout_minutes: i64,
}

impl NotificationConfig {
    /// Config with the fallback disabled and the default window.
    pub fn disabled(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            notification_email: None,
            email_fallback_enabled: false,
            email_fallback_address: None,
            email_fallback_timeout_minutes: DEFAULT_FALLBACK_TIMEOUT_MINUTES,
        }
    }

    /// The escalation window as a duration.
    pub fn fallback_delay(&self) -> std::time::Duration {
        let minutes = self.email_fallback_timeout_minutes.clamp(1, 60) as u64;
        std::time::Duration::from_secs(minutes * 60)
    }
}

/// Conversation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Open,
    Answered,
    Abandoned,
}

/// A conversation between one visitor and the site's operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: String,
    pub site_id: String,
    pub visitor_id: String,
    /// Denormalized visitor display name.
    pub visitor_name: Option<String>,
    pub status: ChatStatus,
    pub created_at: String,
}

impl Chat {
    /// Visitor name for display, falling back to `default`.
    pub fn display_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.visitor_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Visitor,
    Operator,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub direction: Direction,
    pub text: String,
    pub read: bool,
    pub created_at: String,
}

/// Link between a tenant and an external bot account.
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct BotPairing {
    pub site_id: String,
    pub bot_username: String,
    /// Bot API token. Never logged or returned from status endpoints.
    pub bot_credential: String,
    /// Pairing token operators send to the bot as `/start <code>`.
    pub connect_code: String,
    /// Registered webhook URL, if registration succeeded.
    pub webhook_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl fmt::Debug for BotPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotPairing")
            .field("site_id", &self.site_id)
            .field("bot_username", &self.bot_username)
            .field("bot_credential", &"[REDACTED]")
            .field("connect_code", &self.connect_code)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

/// An operator's bot chat subscribed to a tenant's notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BotSubscription {
    pub site_id: String,
    /// Bot API chat ID to push notifications to.
    pub account_ref: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub created_at: String,
}
