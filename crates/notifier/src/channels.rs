//! Seams between the coordinator and the channels it drives.

use async_trait::async_trait;
use bot_bridge::{BotBridge, PushReport};
use database::{chat, site, Database, NotificationConfig};
use fanout::LiveGateway;

use crate::error::NotifyError;

/// Site and conversation lookups.
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    async fn notification_config(&self, site_id: &str) -> Result<NotificationConfig, NotifyError>;

    async fn visitor_name(&self, conversation_id: &str) -> Result<Option<String>, NotifyError>;

    /// Site that owns the conversation.
    async fn conversation_site(&self, conversation_id: &str) -> Result<String, NotifyError>;
}

/// Real-time delivery to operators watching a site.
#[async_trait]
pub trait LiveBroadcaster: Send + Sync {
    async fn broadcast_new_message(
        &self,
        site_id: &str,
        conversation_id: &str,
        visitor_name: Option<&str>,
    );
}

/// Push to operators' bot chats.
#[async_trait]
pub trait BotNotifier: Send + Sync {
    async fn notify_visitor_message(
        &self,
        site_id: &str,
        conversation_id: &str,
    ) -> Result<PushReport, NotifyError>;
}

#[async_trait]
impl SiteDirectory for Database {
    async fn notification_config(&self, site_id: &str) -> Result<NotificationConfig, NotifyError> {
        Ok(site::get_notification_config(self.pool(), site_id).await?)
    }

    async fn visitor_name(&self, conversation_id: &str) -> Result<Option<String>, NotifyError> {
        Ok(chat::get_chat(self.pool(), conversation_id).await?.visitor_name)
    }

    async fn conversation_site(&self, conversation_id: &str) -> Result<String, NotifyError> {
        Ok(chat::get_chat(self.pool(), conversation_id).await?.site_id)
    }
}

#[async_trait]
impl LiveBroadcaster for LiveGateway {
    async fn broadcast_new_message(
        &self,
        site_id: &str,
        conversation_id: &str,
        visitor_name: Option<&str>,
    ) {
        LiveGateway::broadcast_new_message(self, site_id, conversation_id, visitor_name).await
    }
}

#[async_trait]
impl BotNotifier for BotBridge {
    async fn notify_visitor_message(
        &self,
        site_id: &str,
        conversation_id: &str,
    ) -> Result<PushReport, NotifyError> {
        Ok(BotBridge::notify_visitor_message(self, site_id, conversation_id).await?)
    }
}
