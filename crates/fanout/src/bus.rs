//! Tenant-scoped publish/subscribe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// An event delivered to every live operator session of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FanoutEvent {
    /// A visitor wrote a new message.
    #[serde(rename = "chat:new_message")]
    NewMessage {
        conversation_id: String,
        visitor_name: Option<String>,
    },
}

/// Publish/subscribe transport keyed by tenant ID.
///
/// `publish` never fails from the caller's point of view: transport errors are
/// logged and delivery falls back to subscribers in this process.
#[async_trait]
pub trait FanoutBus: Send + Sync {
    /// Deliver `event` to every subscriber of `tenant_id`.
    async fn publish(&self, tenant_id: &str, event: FanoutEvent);

    /// Subscribe to events for `tenant_id`. Dropping the subscription unsubscribes.
    fn subscribe(&self, tenant_id: &str) -> Subscription;
}

/// A live subscription to one tenant's events.
#[derive(Debug)]
pub struct Subscription {
    tenant_id: String,
    receiver: broadcast::Receiver<FanoutEvent>,
}

impl Subscription {
    pub(crate) fn new(tenant_id: impl Into<String>, receiver: broadcast::Receiver<FanoutEvent>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            receiver,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Wait for the next event. Returns `None` once the bus is gone.
    ///
    /// A subscriber that falls behind skips the missed events and keeps going.
    pub async fn recv(&mut self) -> Option<FanoutEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(tenant_id = %self.tenant_id, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<FanoutEvent> {
        self.receiver.try_recv().ok()
    }
}
