//! Route handlers for the notification server.

pub mod bot;
pub mod events;
pub mod health;
pub mod socket;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Operator live sessions
        .route("/ws", get(socket::upgrade))
        // Bot pairing
        .route("/bot/setup", post(bot::setup))
        .route("/bot/status/:site_id", get(bot::status))
        .route("/bot/disconnect/:site_id", delete(bot::disconnect))
        .route("/bot/subscribers/:site_id", get(bot::subscribers))
        .route("/bot/webhook/:site_id", post(bot::webhook))
        // Message ingestion hooks
        .route("/events/visitor-message", post(events::visitor_message))
        .route("/events/operator-message", post(events::operator_message))
}
