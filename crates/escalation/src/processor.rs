use std::sync::Arc;

use database::{chat, site, user, Database, DatabaseError};
use mailer::{Email, MailTransport, SendStatus};
use tracing::{debug, info, instrument, warn};

use crate::digest::{compose, DEFAULT_VISITOR_NAME};
use crate::error::Result;
use crate::queue::EscalationJob;

/// Why a due job sent nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The site no longer exists.
    SiteGone,
    /// The email fallback was turned off after the job was armed.
    Disabled,
    /// The conversation no longer exists or belongs to another site.
    ConversationGone,
    /// Every visitor message was read in the meantime.
    NoUnreadMessages,
    /// Neither owner nor operators have an email address.
    NoRecipients,
    /// No mail transport is configured.
    MailNotConfigured,
}

/// Result of processing one due job. The job is complete either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Sent { recipients: usize },
    Skipped(SkipReason),
}

/// Re-validates a due job against current state and sends the fallback email.
pub struct FallbackProcessor {
    db: Database,
    mailer: Arc<dyn MailTransport>,
    admin_panel_url: String,
}

fn not_found(err: &DatabaseError) -> bool {
    matches!(err, DatabaseError::NotFound { .. })
}

impl FallbackProcessor {
    pub fn new(db: Database, mailer: Arc<dyn MailTransport>, admin_panel_url: impl Into<String>) -> Self {
        Self {
            db,
            mailer,
            admin_panel_url: admin_panel_url.into(),
        }
    }

    #[instrument(skip(self), fields(site_id = %job.site_id, conversation_id = %job.conversation_id))]
    pub async fn process(&self, job: &EscalationJob) -> Result<ProcessOutcome> {
        let pool = self.db.pool();

        let config = match site::get_notification_config(pool, &job.site_id).await {
            Ok(config) => config,
            Err(e) if not_found(&e) => return Ok(skip(SkipReason::SiteGone)),
            Err(e) => return Err(e.into()),
        };
        if !config.email_fallback_enabled {
            return Ok(skip(SkipReason::Disabled));
        }

        let conversation = match chat::get_chat(pool, &job.conversation_id).await {
            Ok(conversation) => conversation,
            Err(e) if not_found(&e) => return Ok(skip(SkipReason::ConversationGone)),
            Err(e) => return Err(e.into()),
        };
        if conversation.site_id != job.site_id {
            warn!(owner_site_id = %conversation.site_id, "Conversation belongs to another site");
            return Ok(ProcessOutcome::Skipped(SkipReason::ConversationGone));
        }

        let unread = chat::unread_visitor_messages(pool, &job.conversation_id).await?;
        if unread.is_empty() {
            return Ok(skip(SkipReason::NoUnreadMessages));
        }

        let recipients = user::site_recipient_emails(pool, &job.site_id).await?;
        if recipients.is_empty() {
            warn!("No recipient emails for site, fallback dropped");
            return Ok(ProcessOutcome::Skipped(SkipReason::NoRecipients));
        }

        let site = site::get_site(pool, &job.site_id).await?;
        let texts: Vec<&str> = unread.iter().map(|m| m.text.as_str()).collect();
        let conversation_url = format!(
            "{}/chats/{}",
            self.admin_panel_url.trim_end_matches('/'),
            job.conversation_id
        );
        let digest = compose(
            site.label(),
            conversation.display_name(DEFAULT_VISITOR_NAME),
            &texts,
            &conversation_url,
        )?;

        let mut email = Email::new_multi(recipients.iter().cloned(), digest.subject, digest.text)
            .with_html(digest.html);
        if let Some(reply_to) = digest.reply_to {
            email = email.with_reply_to(reply_to);
        }

        match self.mailer.send(&email).await? {
            SendStatus::Sent { .. } => {
                info!(recipients = recipients.len(), "Fallback email sent");
                Ok(ProcessOutcome::Sent {
                    recipients: recipients.len(),
                })
            }
            SendStatus::Skipped => Ok(skip(SkipReason::MailNotConfigured)),
        }
    }
}

fn skip(reason: SkipReason) -> ProcessOutcome {
    debug!(?reason, "Fallback skipped");
    ProcessOutcome::Skipped(reason)
}
