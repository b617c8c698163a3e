//! Configuration types for bot-api.

use std::env;
use std::time::Duration;

use crate::error::BotApiError;

/// Default Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default timeout for a single Bot API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for talking to the Bot API.
#[derive(Debug, Clone)]
pub struct BotApiConfig {
    /// Base URL of the Bot API (e.g., "https://api.telegram.org").
    pub base_url: String,
    /// Per-request timeout. Expiry is reported as [`BotApiError::Timeout`].
    pub timeout: Duration,
}

impl BotApiConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BOT_API_BASE` | Bot API base URL | `https://api.telegram.org` |
    /// | `BOT_API_TIMEOUT_SECS` | Request timeout | `10` |
    pub fn from_env() -> Result<Self, BotApiError> {
        let base_url = env::var("BOT_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let timeout = match env::var("BOT_API_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .map_err(|e| BotApiError::Config(format!("Invalid BOT_API_TIMEOUT_SECS: {}", e)))?,
            ),
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self::new(base_url).with_timeout(timeout))
    }

    /// Builder method to set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of a Bot API method for the given token.
    ///
    /// The result embeds the token and must never be logged.
    pub(crate) fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, token, method)
    }
}

impl Default for BotApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}
