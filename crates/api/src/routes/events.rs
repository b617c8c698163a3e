//! Message ingestion hooks.
//!
//! The chat backend calls these after it has stored a message.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use notifier::DispatchReport;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// A stored message in a conversation.
#[derive(Deserialize)]
pub struct MessageEvent {
    pub site_id: String,
    pub chat_id: String,
}

/// Result of an operator message.
#[derive(Serialize)]
pub struct OperatorMessageResponse {
    pub disarmed: bool,
}

/// A visitor wrote a message.
pub async fn visitor_message(
    State(state): State<AppState>,
    Json(event): Json<MessageEvent>,
) -> (StatusCode, Json<DispatchReport>) {
    let report = state
        .coordinator
        .visitor_message_received(&event.site_id, &event.chat_id)
        .await;
    (StatusCode::ACCEPTED, Json(report))
}

/// An operator replied.
pub async fn operator_message(
    State(state): State<AppState>,
    Json(event): Json<MessageEvent>,
) -> (StatusCode, Json<OperatorMessageResponse>) {
    let disarmed = state
        .coordinator
        .operator_message_sent(&event.site_id, &event.chat_id)
        .await;
    (StatusCode::ACCEPTED, Json(OperatorMessageResponse { disarmed }))
}
