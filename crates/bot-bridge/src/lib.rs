//! Bot bridge for ChatIQ.
//!
//! Links a site to a messaging-bot account and pushes new visitor messages to
//! every operator chat that subscribed with the site's connect code.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bot_api::{BotApiConfig, BotClient};
//! use bot_bridge::{BotBridge, BridgeConfig};
//! use database::Database;
//!
//! # async fn example(db: Database) -> Result<(), bot_bridge::BridgeError> {
//! let client = BotClient::new(BotApiConfig::default())?;
//! let bridge = BotBridge::new(db, Arc::new(client), BridgeConfig::new("https://admin.example.com"));
//!
//! let paired = bridge.setup("site-1", "123456:ABC").await?;
//! println!("send /start {} to @{}", paired.connect_code, paired.bot_username);
//!
//! let report = bridge.notify_visitor_message("site-1", "chat-1").await?;
//! println!("{} sent, {} failed", report.sent, report.failed);
//! # Ok(())
//! # }
//! ```

mod api;
mod bridge;
mod error;
mod message;

pub use api::BotApi;
pub use bridge::{
    generate_connect_code, BotBridge, BridgeConfig, BridgeStatus, PushReport, SetupResult,
    UpdateOutcome, CONNECT_CODE_LENGTH, PAIRING_COMMAND,
};
pub use error::{BridgeError, Result};
pub use message::{excerpt, VisitorPush, ANONYMOUS_VISITOR, EXCERPT_LIMIT, OPEN_BUTTON_TEXT};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
