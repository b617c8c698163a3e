use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::bus::{FanoutBus, FanoutEvent, Subscription};

/// Per-tenant channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Process-local bus with one broadcast channel per tenant.
#[derive(Debug)]
pub struct InMemoryBus {
    capacity: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<FanoutEvent>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver to local subscribers, returning how many received the event.
    pub fn deliver(&self, tenant_id: &str, event: FanoutEvent) -> usize {
        let sender = {
            let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
            topics.get(tenant_id).cloned()
        };

        let Some(sender) = sender else {
            return 0;
        };

        match sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                // Every receiver is gone; forget the topic.
                let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
                if topics.get(tenant_id).is_some_and(|s| s.receiver_count() == 0) {
                    topics.remove(tenant_id);
                }
                0
            }
        }
    }

    /// Number of live local subscribers for a tenant.
    pub fn subscriber_count(&self, tenant_id: &str) -> usize {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics.get(tenant_id).map_or(0, |s| s.receiver_count())
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FanoutBus for InMemoryBus {
    async fn publish(&self, tenant_id: &str, event: FanoutEvent) {
        let delivered = self.deliver(tenant_id, event);
        debug!(tenant_id, delivered, "Published event locally");
    }

    fn subscribe(&self, tenant_id: &str) -> Subscription {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let receiver = topics
            .entry(tenant_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription::new(tenant_id, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> FanoutEvent {
        FanoutEvent::NewMessage {
            conversation_id: id.to_string(),
            visitor_name: None,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_in_order() {
        let bus = InMemoryBus::new();
        let mut a = bus.subscribe("site-1");
        let mut b = bus.subscribe("site-1");

        bus.publish("site-1", event("c1")).await;
        bus.publish("site-1", event("c2")).await;

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(event("c1")));
            assert_eq!(sub.recv().await, Some(event("c2")));
        }
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let bus = InMemoryBus::new();
        let mut one = bus.subscribe("site-1");
        let mut two = bus.subscribe("site-2");

        bus.publish("site-2", event("c9")).await;
        bus.publish("site-1", event("c1")).await;

        assert_eq!(one.recv().await, Some(event("c1")));
        assert_eq!(two.recv().await, Some(event("c9")));
        assert_eq!(one.try_recv(), None);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = InMemoryBus::new();
        assert_eq!(bus.deliver("nobody", event("c1")), 0);

        let sub = bus.subscribe("site-1");
        assert_eq!(bus.subscriber_count("site-1"), 1);
        drop(sub);
        assert_eq!(bus.deliver("site-1", event("c1")), 0);
        assert_eq!(bus.subscriber_count("site-1"), 0);
    }
}
