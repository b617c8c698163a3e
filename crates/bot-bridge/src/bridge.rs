use std::sync::Arc;

use bot_api::{SendMessageParams, Update};
use database::{bot_pairing, chat, site, BotPairing, BotSubscription, Database};
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::api::BotApi;
use crate::error::{BridgeError, Result};
use crate::message::{VisitorPush, REPLY_INVALID_CODE, REPLY_SUBSCRIBED, REPLY_USAGE};

/// Length of a connect code.
pub const CONNECT_CODE_LENGTH: usize = 6;

const CONNECT_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Command operators send to the bot to subscribe.
pub const PAIRING_COMMAND: &str = "/start";

/// Deployment settings for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the admin panel, used for "Open conversation" links.
    pub admin_panel_url: String,
    /// Public base URL the bot webhook is registered under. Webhooks are not
    /// registered when unset.
    pub public_webhook_base: Option<String>,
}

impl BridgeConfig {
    pub fn new(admin_panel_url: impl Into<String>) -> Self {
        Self {
            admin_panel_url: admin_panel_url.into(),
            public_webhook_base: None,
        }
    }

    pub fn with_webhook_base(mut self, base: impl Into<String>) -> Self {
        self.public_webhook_base = Some(base.into());
        self
    }

    /// Webhook URL for a site, if a public base is configured.
    pub fn webhook_url(&self, site_id: &str) -> Option<String> {
        self.public_webhook_base
            .as_deref()
            .map(|base| format!("{}/bot/webhook/{}", base.trim_end_matches('/'), site_id))
    }
}

/// Result of a successful setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupResult {
    pub connect_code: String,
    pub bot_username: String,
}

/// Pairing status as shown to the site owner. Never includes the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_code: Option<String>,
    pub subscribers_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl BridgeStatus {
    fn disabled() -> Self {
        Self {
            enabled: false,
            bot_username: None,
            connect_code: None,
            subscribers_count: 0,
            webhook_url: None,
        }
    }
}

/// What an inbound update led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Not a pairing command.
    Ignored,
    /// `/start` without a code.
    UsageHint,
    /// Wrong code, or the site has no pairing.
    InvalidCode,
    /// The sender's chat is now subscribed.
    Subscribed,
}

/// Per-subscriber delivery counts of one push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub sent: usize,
    pub failed: usize,
}

impl PushReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Pairs sites with bot accounts and pushes new-message notifications to
/// subscribed operator chats.
#[derive(Clone)]
pub struct BotBridge {
    db: Database,
    api: Arc<dyn BotApi>,
    config: BridgeConfig,
}

impl BotBridge {
    pub fn new(db: Database, api: Arc<dyn BotApi>, config: BridgeConfig) -> Self {
        Self { db, api, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Pair a site with a bot, replacing any previous pairing.
    ///
    /// The credential is verified first; on failure nothing changes.
    #[instrument(skip(self, credential))]
    pub async fn setup(&self, site_id: &str, credential: &str) -> Result<SetupResult> {
        let identity = match self.api.get_me(credential).await {
            Ok(identity) if identity.is_bot => identity,
            Ok(_) => {
                warn!("Credential does not belong to a bot account");
                return Err(BridgeError::InvalidCredential);
            }
            Err(e) => {
                warn!(error = %e, "Bot credential validation failed");
                return Err(BridgeError::InvalidCredential);
            }
        };

        let bot_username = identity.username.unwrap_or(identity.first_name);
        let connect_code = generate_connect_code();

        bot_pairing::upsert_pairing(
            self.db.pool(),
            site_id,
            &bot_username,
            credential,
            &connect_code,
        )
        .await?;

        self.register_webhook(site_id, credential).await;

        info!(bot_username = %bot_username, "Bot paired");
        Ok(SetupResult {
            connect_code,
            bot_username,
        })
    }

    async fn register_webhook(&self, site_id: &str, credential: &str) {
        let Some(url) = self.config.webhook_url(site_id) else {
            warn!(site_id, "Public webhook base not set, skipping webhook registration");
            return;
        };

        if let Err(e) = self.api.set_webhook(credential, &url).await {
            warn!(site_id, error = %e, "Webhook registration failed");
            return;
        }

        match bot_pairing::set_webhook_url(self.db.pool(), site_id, &url).await {
            Ok(()) => info!(site_id, url = %url, "Webhook registered"),
            Err(e) => warn!(site_id, error = %e, "Failed to store webhook URL"),
        }
    }

    /// Handle an inbound webhook update for a site.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, site_id: &str, update: &Update) -> Result<UpdateOutcome> {
        let (Some(text), Some(account_ref)) = (update.text(), update.chat_ref()) else {
            return Ok(UpdateOutcome::Ignored);
        };

        let mut parts = text.split_whitespace();
        if parts.next() != Some(PAIRING_COMMAND) {
            debug!("Ignoring non-command message");
            return Ok(UpdateOutcome::Ignored);
        }

        let pairing = bot_pairing::get_pairing(self.db.pool(), site_id).await?;

        let Some(code) = parts.next() else {
            self.reply(pairing.as_ref(), &account_ref, REPLY_USAGE).await;
            return Ok(UpdateOutcome::UsageHint);
        };

        let pairing = match pairing {
            Some(pairing) if pairing.connect_code == code => pairing,
            other => {
                warn!(site_id, "Invalid connect code");
                self.reply(other.as_ref(), &account_ref, REPLY_INVALID_CODE).await;
                return Ok(UpdateOutcome::InvalidCode);
            }
        };

        let sender = update.sender();
        bot_pairing::upsert_subscription(
            self.db.pool(),
            site_id,
            &account_ref,
            sender.and_then(|s| s.username.as_deref()),
            sender.and_then(|s| s.first_name.as_deref()),
        )
        .await?;

        info!(site_id, account_ref = %account_ref, "Subscription created");
        self.reply(Some(&pairing), &account_ref, REPLY_SUBSCRIBED).await;
        Ok(UpdateOutcome::Subscribed)
    }

    async fn reply(&self, pairing: Option<&BotPairing>, account_ref: &str, text: &str) {
        let Some(pairing) = pairing else {
            warn!(account_ref, "No pairing, cannot reply");
            return;
        };

        let params = SendMessageParams::text(account_ref, text);
        if let Err(e) = self.api.send_message(&pairing.bot_credential, &params).await {
            warn!(account_ref, error = %e, "Failed to send reply");
        }
    }

    /// Remove a site's pairing and its subscriptions. No-op when unpaired.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, site_id: &str) -> Result<()> {
        let Some(pairing) = bot_pairing::get_pairing(self.db.pool(), site_id).await? else {
            return Ok(());
        };

        if let Err(e) = self.api.delete_webhook(&pairing.bot_credential).await {
            warn!(site_id, error = %e, "Failed to delete webhook");
        }

        bot_pairing::delete_pairing(self.db.pool(), site_id).await?;
        info!(site_id, "Bot disconnected");
        Ok(())
    }

    pub async fn status(&self, site_id: &str) -> Result<BridgeStatus> {
        let Some(pairing) = bot_pairing::get_pairing(self.db.pool(), site_id).await? else {
            return Ok(BridgeStatus::disabled());
        };

        let subscribers_count = bot_pairing::count_subscriptions(self.db.pool(), site_id).await?;
        Ok(BridgeStatus {
            enabled: true,
            bot_username: Some(pairing.bot_username),
            connect_code: Some(pairing.connect_code),
            subscribers_count,
            webhook_url: pairing.webhook_url,
        })
    }

    pub async fn subscribers(&self, site_id: &str) -> Result<Vec<BotSubscription>> {
        Ok(bot_pairing::list_subscriptions(self.db.pool(), site_id).await?)
    }

    /// Push a new visitor message to every subscriber of the site.
    ///
    /// Each subscriber is sent to independently; failures are counted and
    /// logged, never retried.
    #[instrument(skip(self))]
    pub async fn notify_visitor_message(&self, site_id: &str, conversation_id: &str) -> Result<PushReport> {
        let pool = self.db.pool();

        let Some(pairing) = bot_pairing::get_pairing(pool, site_id).await? else {
            debug!("No bot pairing for site");
            return Ok(PushReport::default());
        };

        let subscriptions = bot_pairing::list_subscriptions(pool, site_id).await?;
        if subscriptions.is_empty() {
            debug!("No subscribers for site");
            return Ok(PushReport::default());
        }

        let site = site::get_site(pool, site_id).await?;
        let conversation = chat::get_chat(pool, conversation_id).await?;
        if conversation.site_id != site_id {
            warn!(owner_site_id = %conversation.site_id, "Conversation belongs to another site, not pushing");
            return Ok(PushReport::default());
        }
        let message = chat::latest_visitor_message(pool, conversation_id).await?;

        let push = VisitorPush {
            conversation_id,
            visitor_name: conversation.visitor_name.as_deref(),
            text: message.as_ref().map(|m| m.text.as_str()),
            site_label: site.label(),
            sent_at: message.as_ref().map(|m| m.created_at.as_str()),
        };

        let sends = subscriptions.iter().map(|subscription| {
            let params = push.to_params(&subscription.account_ref, &self.config.admin_panel_url);
            let credential = pairing.bot_credential.as_str();
            async move {
                match self.api.send_message(credential, &params).await {
                    Ok(_) => {
                        debug!(account_ref = %subscription.account_ref, "Notification sent");
                        true
                    }
                    Err(e) => {
                        warn!(account_ref = %subscription.account_ref, error = %e, "Failed to send notification");
                        false
                    }
                }
            }
        });

        let results = join_all(sends).await;
        let sent = results.iter().filter(|ok| **ok).count();
        let report = PushReport {
            sent,
            failed: results.len() - sent,
        };

        info!(sent = report.sent, failed = report.failed, "Bot push complete");
        Ok(report)
    }
}

/// Random connect code from `[A-Z0-9]`.
pub fn generate_connect_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CONNECT_CODE_LENGTH)
        .map(|_| CONNECT_CODE_ALPHABET[rng.gen_range(0..CONNECT_CODE_ALPHABET.len())] as char)
        .collect()
}
