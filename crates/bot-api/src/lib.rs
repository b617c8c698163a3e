//! Bot API client library.
//!
//! This crate provides a Rust client for the Telegram-style Bot HTTP API used
//! to push operator notifications. It supports:
//!
//! - Resolving a bot token to its identity (`getMe`)
//! - Sending text messages with a link button
//! - Registering and removing webhooks
//! - Parsing inbound webhook updates
//!
//! # Example
//!
//! ```no_run
//! use bot_api::{BotApiConfig, BotClient, LinkButton, SendMessageParams};
//!
//! # async fn example() -> Result<(), bot_api::BotApiError> {
//! let client = BotClient::new(BotApiConfig::default())?;
//!
//! let me = client.get_me("123456:ABC").await?;
//! println!("paired with @{}", me.username.unwrap_or_default());
//!
//! let params = SendMessageParams::text("42", "New chat!")
//!     .with_link_button(LinkButton::new("Open", "https://admin.example.com/chats/1"));
//! client.send_message("123456:ABC", &params).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::BotClient;
pub use config::{BotApiConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::BotApiError;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
