//! HTTP and WebSocket surface of the ChatIQ notification server.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

/// Build the application with its state attached.
pub fn app(state: AppState) -> Router {
    routes::router().with_state(state)
}
