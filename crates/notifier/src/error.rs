//! Error types for notification dispatch.

use bot_bridge::BridgeError;
use database::DatabaseError;
use escalation::EscalationError;
use thiserror::Error;

/// Errors a single notification channel can report.
///
/// The coordinator logs these and records them in its report; they never
/// reach the caller that ingested the message.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Site or conversation lookup failed.
    #[error("lookup failed: {0}")]
    Directory(#[from] DatabaseError),

    /// Bot push failed.
    #[error("bot push failed: {0}")]
    Bot(#[from] BridgeError),

    /// The conversation is not one of the site's.
    #[error("conversation {conversation_id} does not belong to site {site_id}")]
    ForeignConversation {
        site_id: String,
        conversation_id: String,
    },

    /// Escalation queue failed.
    #[error("escalation failed: {0}")]
    Escalation(#[from] EscalationError),
}
