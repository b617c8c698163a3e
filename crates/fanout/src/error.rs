use thiserror::Error;

/// Errors raised while setting up a fanout transport.
///
/// Publishing never surfaces these; transport failures during publish are
/// logged and delivery degrades to this process only.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors returned by the live session gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The operator is neither owner nor operator of the site.
    #[error("Access denied to site {site_id}")]
    Forbidden { site_id: String },

    /// The connection has not joined the site it asked about.
    #[error("Not joined to site {site_id}")]
    NotJoined { site_id: String },

    /// The connection was closed.
    #[error("Connection closed")]
    Closed,

    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),
}
