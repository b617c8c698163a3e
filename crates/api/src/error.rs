//! Error types for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bot_bridge::BridgeError;
use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bot pairing or push error.
    #[error("Bot bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// The request lacks something it needs.
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Bridge(BridgeError::InvalidCredential) => {
                (StatusCode::BAD_REQUEST, "invalid_credential".to_string())
            }
            ApiError::Bridge(BridgeError::BotApi(err)) => {
                tracing::warn!("Bot API error: {}", err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            ApiError::Bridge(BridgeError::Database(DatabaseError::NotFound { .. }))
            | ApiError::Database(DatabaseError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Bridge(BridgeError::Database(err)) | ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
