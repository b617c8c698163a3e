//! Bot pairing routes.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use bot_api::Update;
use bot_bridge::{BridgeStatus, SetupResult};
use database::BotSubscription;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::state::AppState;

/// Request to pair a site with a bot.
#[derive(Deserialize)]
pub struct SetupRequest {
    pub site_id: String,
    pub bot_token: String,
}

/// Setup response envelope.
#[derive(Serialize)]
pub struct SetupResponse {
    pub success: bool,
    pub data: SetupResult,
}

/// Disconnect response.
#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Subscribers of a site's bot.
#[derive(Serialize)]
pub struct SubscribersResponse {
    pub count: usize,
    pub subscribers: Vec<BotSubscription>,
}

/// Webhook acknowledgement.
#[derive(Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

/// Validate a bot credential and pair it with the site.
pub async fn setup(
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<SetupResponse>> {
    let data = state.bridge.setup(&req.site_id, &req.bot_token).await?;
    info!(site_id = %req.site_id, bot = %data.bot_username, "Bot paired");
    Ok(Json(SetupResponse {
        success: true,
        data,
    }))
}

/// Pairing status for a site.
pub async fn status(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<Json<BridgeStatus>> {
    Ok(Json(state.bridge.status(&site_id).await?))
}

/// Remove the site's pairing and every subscription.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<Json<DisconnectResponse>> {
    state.bridge.disconnect(&site_id).await?;
    Ok(Json(DisconnectResponse { success: true }))
}

/// List subscribed operator chats.
pub async fn subscribers(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<Json<SubscribersResponse>> {
    let subscribers = state.bridge.subscribers(&site_id).await?;
    Ok(Json(SubscribersResponse {
        count: subscribers.len(),
        subscribers,
    }))
}

/// Inbound bot update. Always acknowledged so the Bot API does not retry.
pub async fn webhook(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    body: Bytes,
) -> Json<WebhookAck> {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => match state.bridge.handle_update(&site_id, &update).await {
            Ok(outcome) => debug!(site_id = %site_id, ?outcome, "Bot update handled"),
            Err(e) => warn!(site_id = %site_id, error = %e, "Bot update failed"),
        },
        Err(e) => warn!(site_id = %site_id, error = %e, "Malformed bot update"),
    }
    Json(WebhookAck { ok: true })
}
