//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Notification server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Redis URL. Without it the bus and the escalation queue stay in-process.
    pub redis_url: Option<String>,
    /// Admin panel base URL used in bot and email links.
    pub admin_panel_url: String,
    /// Public base URL the bot webhooks are registered under.
    pub public_webhook_base: Option<String>,
    /// How often the escalation worker polls for due jobs.
    pub escalation_poll: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:chatiq.db?mode=rwc` |
    /// | `REDIS_URL` | Redis for cross-instance fanout and escalations | (in-process) |
    /// | `ADMIN_PANEL_URL` | Admin panel base URL | `http://localhost:3000` |
    /// | `PUBLIC_WEBHOOK_BASE` | Public base URL for bot webhooks | (none) |
    /// | `ESCALATION_POLL_MS` | Escalation poll interval | `1000` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup("API_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            lookup("SQLITE_PATH").unwrap_or_else(|| "sqlite:chatiq.db?mode=rwc".to_string());

        let admin_panel_url = lookup("ADMIN_PANEL_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let escalation_poll = match lookup("ESCALATION_POLL_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidPollInterval(raw)),
            },
            None => Duration::from_millis(1000),
        };

        Ok(Self {
            addr,
            database_url,
            redis_url: non_empty(lookup("REDIS_URL")),
            admin_panel_url,
            public_webhook_base: non_empty(lookup("PUBLIC_WEBHOOK_BASE")),
            escalation_poll,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("Invalid ESCALATION_POLL_MS: {0}")]
    InvalidPollInterval(String),
}
