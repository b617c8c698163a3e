//! Application state shared across handlers.

use std::sync::Arc;

use bot_bridge::BotBridge;
use escalation::EscalationQueue;
use fanout::LiveGateway;
use notifier::Coordinator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Operator session gateway.
    pub gateway: Arc<LiveGateway>,
    /// Bot pairing and push.
    pub bridge: BotBridge,
    /// Fans chat events out to every channel.
    pub coordinator: Coordinator,
}

impl AppState {
    /// Wire the coordinator over the gateway, the bridge and the escalation
    /// queue.
    pub fn new(
        gateway: Arc<LiveGateway>,
        bridge: BotBridge,
        escalations: Arc<dyn EscalationQueue>,
        directory: database::Database,
    ) -> Self {
        let coordinator = Coordinator::new(
            Arc::new(directory),
            gateway.clone(),
            Arc::new(bridge.clone()),
            escalations,
        );
        Self {
            gateway,
            bridge,
            coordinator,
        }
    }
}
