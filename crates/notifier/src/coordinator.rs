//! Coordinator that fans chat events out to every notification channel.

use std::sync::Arc;

use escalation::{EscalationJob, EscalationQueue};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::channels::{BotNotifier, LiveBroadcaster, SiteDirectory};
use crate::error::NotifyError;

/// What the bot channel did for one visitor message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BotStatus {
    /// Pushed to every subscriber; zero counts mean nobody is subscribed.
    Pushed { sent: usize, failed: usize },
    Failed { error: String },
}

/// What the escalation channel did for one visitor message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscalationStatus {
    /// A new fallback job was scheduled.
    Armed { delay_minutes: i64 },
    /// A job for this conversation was already pending and keeps its due time.
    AlreadyArmed,
    /// The site has the email fallback turned off.
    Disabled,
    Failed { error: String },
}

/// Per-channel outcome of a visitor message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub broadcast: bool,
    pub bot: BotStatus,
    pub escalation: EscalationStatus,
}

impl DispatchReport {
    /// Nothing was dispatched.
    fn rejected(error: &NotifyError) -> Self {
        Self {
            broadcast: false,
            bot: BotStatus::Failed {
                error: error.to_string(),
            },
            escalation: EscalationStatus::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Drives live broadcast, bot push and email escalation for chat events.
///
/// Every channel runs independently; a failure in one is logged and reported
/// but never stops the others or reaches the caller.
#[derive(Clone)]
pub struct Coordinator {
    directory: Arc<dyn SiteDirectory>,
    live: Arc<dyn LiveBroadcaster>,
    bot: Arc<dyn BotNotifier>,
    escalations: Arc<dyn EscalationQueue>,
}

impl Coordinator {
    pub fn new(
        directory: Arc<dyn SiteDirectory>,
        live: Arc<dyn LiveBroadcaster>,
        bot: Arc<dyn BotNotifier>,
        escalations: Arc<dyn EscalationQueue>,
    ) -> Self {
        Self {
            directory,
            live,
            bot,
            escalations,
        }
    }

    /// A visitor wrote a message: broadcast it, push it to bots, and arm
    /// the email fallback if the site has it on.
    #[instrument(skip(self))]
    pub async fn visitor_message_received(&self, site_id: &str, conversation_id: &str) -> DispatchReport {
        match self.owned_by(site_id, conversation_id).await {
            Ok(true) => {}
            Ok(false) => {
                let error = foreign(site_id, conversation_id);
                warn!(error = %error, "Visitor message rejected");
                return DispatchReport::rejected(&error);
            }
            // Each channel re-reads the conversation and handles a missing one.
            Err(e) => warn!(error = %e, "Conversation owner lookup failed"),
        }

        let (broadcast, bot, escalation) = tokio::join!(
            self.broadcast(site_id, conversation_id),
            self.push(site_id, conversation_id),
            self.escalate(site_id, conversation_id),
        );

        let report = DispatchReport {
            broadcast,
            bot,
            escalation,
        };
        info!(?report, "Visitor message dispatched");
        report
    }

    /// An operator replied: cancel the pending fallback, if any.
    ///
    /// Returns whether a job was cancelled. A conversation of another site,
    /// or one whose owner cannot be looked up, is left alone.
    #[instrument(skip(self))]
    pub async fn operator_message_sent(&self, site_id: &str, conversation_id: &str) -> bool {
        match self.owned_by(site_id, conversation_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(error = %foreign(site_id, conversation_id), "Operator message rejected");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Conversation owner lookup failed, not cancelling");
                return false;
            }
        }

        match self.escalations.disarm(conversation_id).await {
            Ok(disarmed) => {
                if disarmed {
                    info!("Pending fallback cancelled");
                }
                disarmed
            }
            Err(e) => {
                warn!(error = %e, "Failed to cancel pending fallback");
                false
            }
        }
    }

    async fn owned_by(&self, site_id: &str, conversation_id: &str) -> Result<bool, NotifyError> {
        Ok(self.directory.conversation_site(conversation_id).await? == site_id)
    }

    async fn broadcast(&self, site_id: &str, conversation_id: &str) -> bool {
        let visitor_name = match self.directory.visitor_name(conversation_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "Visitor name lookup failed, broadcasting without it");
                None
            }
        };

        self.live
            .broadcast_new_message(site_id, conversation_id, visitor_name.as_deref())
            .await;
        true
    }

    async fn push(&self, site_id: &str, conversation_id: &str) -> BotStatus {
        match self.bot.notify_visitor_message(site_id, conversation_id).await {
            Ok(report) => BotStatus::Pushed {
                sent: report.sent,
                failed: report.failed,
            },
            Err(e) => {
                warn!(error = %e, "Bot push failed");
                BotStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn escalate(&self, site_id: &str, conversation_id: &str) -> EscalationStatus {
        let config = match self.directory.notification_config(site_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Notification config lookup failed");
                return EscalationStatus::Failed {
                    error: e.to_string(),
                };
            }
        };

        if !config.email_fallback_enabled {
            return EscalationStatus::Disabled;
        }

        let job = EscalationJob::new(site_id, conversation_id);
        match self.escalations.arm(job, config.fallback_delay()).await {
            Ok(true) => EscalationStatus::Armed {
                delay_minutes: config.email_fallback_timeout_minutes,
            },
            Ok(false) => EscalationStatus::AlreadyArmed,
            Err(e) => {
                warn!(error = %e, "Failed to arm fallback");
                EscalationStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

fn foreign(site_id: &str, conversation_id: &str) -> NotifyError {
    NotifyError::ForeignConversation {
        site_id: site_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}
