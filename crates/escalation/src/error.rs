use thiserror::Error;

/// Errors that can occur while scheduling or processing escalations.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The queue backend could not be reached.
    #[error("Queue transport error: {0}")]
    Transport(#[from] redis::RedisError),

    /// A stored job could not be encoded or decoded.
    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    #[error("Mail error: {0}")]
    Mail(#[from] mailer::MailError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

pub type Result<T> = std::result::Result<T, EscalationError>;
