//! ChatIQ notification server.
//!
//! Serves operator sockets, bot pairing and the message ingestion hooks, and
//! runs the email escalation worker alongside.

use std::sync::Arc;

use api::{AppState, Config};
use bot_api::{BotApiConfig, BotClient};
use bot_bridge::{BotBridge, BridgeConfig};
use database::Database;
use escalation::{EscalationQueue, EscalationWorker, FallbackProcessor, InMemoryQueue, RedisQueue};
use fanout::{FanoutBus, InMemoryBus, LiveGateway, RedisBus};
use mailer::Mailer;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting notification server");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let (bus, queue): (Arc<dyn FanoutBus>, Arc<dyn EscalationQueue>) = match &config.redis_url {
        Some(url) => {
            info!("Using Redis for fanout and escalations");
            (
                Arc::new(RedisBus::connect(url).await?),
                Arc::new(RedisQueue::connect(url).await?),
            )
        }
        None => {
            warn!("REDIS_URL not set, fanout and escalations stay in this process");
            (Arc::new(InMemoryBus::new()), Arc::new(InMemoryQueue::new()))
        }
    };

    let mailer = Mailer::from_env()?;
    if !mailer.is_configured() {
        warn!("SMTP not configured, fallback emails will be skipped");
    }

    let mut bridge_config = BridgeConfig::new(&config.admin_panel_url);
    match &config.public_webhook_base {
        Some(base) => bridge_config = bridge_config.with_webhook_base(base),
        None => warn!("PUBLIC_WEBHOOK_BASE not set, bot webhooks will not be registered"),
    }
    let bot_client = BotClient::new(BotApiConfig::from_env()?)?;
    let bridge = BotBridge::new(db.clone(), Arc::new(bot_client), bridge_config);

    let gateway = Arc::new(LiveGateway::new(db.clone(), bus));
    let state = AppState::new(gateway, bridge, queue.clone(), db.clone());

    // Escalation worker
    let processor = Arc::new(FallbackProcessor::new(
        db.clone(),
        Arc::new(mailer),
        config.admin_panel_url.clone(),
    ));
    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = tokio::spawn(
        EscalationWorker::new(queue, processor)
            .with_poll_interval(config.escalation_poll)
            .run(stop_rx),
    );

    let app = api::app(state);

    info!(addr = %config.addr, "Notification server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping escalation worker");
    let _ = stop_tx.send(true);
    if let Err(e) = worker.await {
        warn!(error = %e, "Escalation worker ended abnormally");
    }
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
