//! Error types for bot-api.

use thiserror::Error;

/// Errors that can occur when calling the Bot API.
#[derive(Debug, Error)]
pub enum BotApiError {
    /// HTTP request failed (URL stripped so the token never leaks).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Bot API request timed out")]
    Timeout,

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with `ok: false`.
    #[error("Bot API error {code}: {description}")]
    Api { code: i32, description: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BotApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotApiError::Timeout
        } else {
            BotApiError::Http(err.without_url())
        }
    }
}

impl BotApiError {
    /// Whether the API rejected the token itself.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BotApiError::Api { code: 401, .. } | BotApiError::Api { code: 404, .. })
    }
}
