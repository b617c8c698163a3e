//! Redis pub/sub fanout across server instances.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{FanoutBus, FanoutEvent, Subscription};
use crate::error::BusError;
use crate::memory::InMemoryBus;

const CHANNEL_PREFIX: &str = "fanout:";
const CHANNEL_PATTERN: &str = "fanout:*";

/// Configuration for subscriber reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of retries (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = Duration::from_millis(delay_ms.min(u64::MAX as f64) as u64);
        delay.min(self.max_delay)
    }

    /// Check if we should retry after the given number of attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_retries.map_or(true, |max| attempts < max)
    }
}

/// Wire envelope published on `fanout:{tenant}`.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Instance that published the event.
    origin: String,
    event: FanoutEvent,
}

fn channel_for(tenant_id: &str) -> String {
    format!("{}{}", CHANNEL_PREFIX, tenant_id)
}

/// Bus that delivers locally at publish time and relays through Redis to
/// every other instance.
pub struct RedisBus {
    local: Arc<InMemoryBus>,
    conn: ConnectionManager,
    instance_id: String,
    subscriber: JoinHandle<()>,
}

impl RedisBus {
    /// Connect to Redis and start the pattern subscriber.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        Self::connect_with(url, ReconnectConfig::default()).await
    }

    /// Connect with a custom subscriber reconnection policy.
    pub async fn connect_with(url: &str, reconnect: ReconnectConfig) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        let local = Arc::new(InMemoryBus::new());
        let instance_id = uuid::Uuid::new_v4().to_string();

        let subscriber = tokio::spawn(run_subscriber(
            client,
            Arc::clone(&local),
            instance_id.clone(),
            reconnect,
        ));

        info!(instance_id = %instance_id, "Redis fanout bus connected");

        Ok(Self {
            local,
            conn,
            instance_id,
            subscriber,
        })
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    async fn relay(&self, tenant_id: &str, event: FanoutEvent) -> Result<(), BusError> {
        let payload = serde_json::to_string(&Envelope {
            origin: self.instance_id.clone(),
            event,
        })?;
        let mut conn = self.conn.clone();
        let _receivers: i64 = conn.publish(channel_for(tenant_id), payload).await?;
        Ok(())
    }
}

impl Drop for RedisBus {
    fn drop(&mut self) {
        self.subscriber.abort();
    }
}

#[async_trait]
impl FanoutBus for RedisBus {
    async fn publish(&self, tenant_id: &str, event: FanoutEvent) {
        let delivered = self.local.deliver(tenant_id, event.clone());
        debug!(tenant_id, delivered, "Delivered event locally");

        if let Err(e) = self.relay(tenant_id, event).await {
            warn!(tenant_id, error = %e, "Redis publish failed, delivered to this instance only");
        }
    }

    fn subscribe(&self, tenant_id: &str) -> Subscription {
        self.local.subscribe(tenant_id)
    }
}

async fn run_subscriber(
    client: redis::Client,
    local: Arc<InMemoryBus>,
    instance_id: String,
    reconnect: ReconnectConfig,
) {
    let mut attempts: u32 = 0;

    loop {
        match client.get_async_pubsub().await {
            Ok(mut pubsub) => match pubsub.psubscribe(CHANNEL_PATTERN).await {
                Ok(()) => {
                    info!(pattern = CHANNEL_PATTERN, "Subscribed to fanout channels");
                    attempts = 0;

                    let mut messages = pubsub.on_message();
                    while let Some(msg) = messages.next().await {
                        relay_to_local(&local, &instance_id, &msg);
                    }
                    warn!("Fanout subscription closed");
                }
                Err(e) => warn!(error = %e, "Failed to subscribe to fanout channels"),
            },
            Err(e) => warn!(error = %e, "Failed to open Redis pub/sub connection"),
        }

        if !reconnect.should_retry(attempts) {
            error!(attempts, "Giving up on fanout subscription");
            return;
        }
        let delay = reconnect.delay_for_attempt(attempts);
        attempts = attempts.saturating_add(1);
        debug!(?delay, attempts, "Reconnecting fanout subscriber");
        tokio::time::sleep(delay).await;
    }
}

fn relay_to_local(local: &InMemoryBus, instance_id: &str, msg: &redis::Msg) {
    let channel = msg.get_channel_name();
    let Some(tenant_id) = channel.strip_prefix(CHANNEL_PREFIX) else {
        return;
    };

    let payload: String = match msg.get_payload() {
        Ok(p) => p,
        Err(e) => {
            warn!(channel, error = %e, "Unreadable fanout payload");
            return;
        }
    };

    match serde_json::from_str::<Envelope>(&payload) {
        Ok(envelope) if envelope.origin == instance_id => {}
        Ok(envelope) => {
            let delivered = local.deliver(tenant_id, envelope.event);
            debug!(tenant_id, delivered, "Relayed remote event");
        }
        Err(e) => warn!(channel, error = %e, "Failed to parse fanout envelope"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(30));
        assert!(config.should_retry(1_000));

        let bounded = ReconnectConfig {
            max_retries: Some(2),
            ..ReconnectConfig::default()
        };
        assert!(bounded.should_retry(1));
        assert!(!bounded.should_retry(2));
    }

    #[test]
    fn test_envelope_format() {
        let envelope = Envelope {
            origin: "instance-a".to_string(),
            event: FanoutEvent::NewMessage {
                conversation_id: "c1".to_string(),
                visitor_name: None,
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["origin"], "instance-a");
        assert_eq!(json["event"]["type"], "chat:new_message");
        assert_eq!(channel_for("site-1"), "fanout:site-1");
    }
}
