use bot_api::BotApiError;
use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur during bot bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bot credential was rejected or could not be verified.
    #[error("Invalid bot credential")]
    InvalidCredential,

    /// Bot API communication error.
    #[error("Bot API error: {0}")]
    BotApi(#[from] BotApiError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
