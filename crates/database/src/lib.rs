//! SQLite persistence layer for ChatIQ.
//!
//! This crate provides async database operations for tenants (sites), their
//! notification settings and operators, conversations and messages, and bot
//! pairings, using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, site};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:chatiq.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let config = site::get_notification_config(db.pool(), "site-1").await?;
//!     println!("fallback enabled: {}", config.email_fallback_enabled);
//!
//!     Ok(())
//! }
//! ```

pub mod bot_pairing;
pub mod chat;
pub mod error;
pub mod models;
pub mod site;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    BotPairing, BotSubscription, Chat, ChatStatus, Direction, Message, NotificationConfig, Site,
    User,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `sqlite::memory:` for an in-memory database (tests).
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url = %url, pool_size, "Connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seed_site(db: &Database) -> Site {
        let owner = User {
            id: "owner-1".to_string(),
            email: Some("owner@example.com".to_string()),
            name: "Olena".to_string(),
        };
        user::create_user(db.pool(), &owner).await.unwrap();

        let site = Site {
            id: "site-1".to_string(),
            name: "Shop".to_string(),
            domain: Some("shop.example.com".to_string()),
            owner_id: owner.id.clone(),
        };
        site::create_site(db.pool(), &site).await.unwrap();
        site
    }

    #[tokio::test]
    async fn test_notification_config_roundtrip() {
        let db = test_db().await;
        let site = seed_site(&db).await;

        let config = site::get_notification_config(db.pool(), &site.id).await.unwrap();
        assert!(!config.email_fallback_enabled);
        assert_eq!(config.email_fallback_timeout_minutes, 5);

        let updated = NotificationConfig {
            email_fallback_enabled: true,
            email_fallback_timeout_minutes: 15,
            email_fallback_address: Some("support@example.com".to_string()),
            ..config
        };
        site::update_notification_config(db.pool(), &updated).await.unwrap();

        let fetched = site::get_notification_config(db.pool(), &site.id).await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_notification_config_rejects_out_of_range_timeout() {
        let db = test_db().await;
        let site = seed_site(&db).await;

        let mut config = site::get_notification_config(db.pool(), &site.id).await.unwrap();
        config.email_fallback_timeout_minutes = 0;

        let result = site::update_notification_config(db.pool(), &config).await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));

        let fetched = site::get_notification_config(db.pool(), &site.id).await.unwrap();
        assert_eq!(fetched.email_fallback_timeout_minutes, 5);
    }

    #[tokio::test]
    async fn test_site_access_and_recipients() {
        let db = test_db().await;
        let site = seed_site(&db).await;

        for (id, email) in [
            ("op-1", Some("op1@example.com")),
            ("op-2", None),
            ("op-3", Some("OWNER@example.com")),
        ] {
            let user = User {
                id: id.to_string(),
                email: email.map(String::from),
                name: id.to_string(),
            };
            user::create_user(db.pool(), &user).await.unwrap();
            user::add_operator(db.pool(), &site.id, id).await.unwrap();
        }

        assert!(user::has_site_access(db.pool(), &site.id, "owner-1").await.unwrap());
        assert!(user::has_site_access(db.pool(), &site.id, "op-2").await.unwrap());
        assert!(!user::has_site_access(db.pool(), &site.id, "stranger").await.unwrap());
        assert!(!user::has_site_access(db.pool(), "other-site", "owner-1").await.unwrap());

        let emails = user::site_recipient_emails(db.pool(), &site.id).await.unwrap();
        assert_eq!(emails, vec!["owner@example.com", "op1@example.com"]);
    }

    #[tokio::test]
    async fn test_unread_conversation_count() {
        let db = test_db().await;
        let site = seed_site(&db).await;
        let pool = db.pool();

        let a = chat::create_chat(pool, &site.id, "visitor-a", Some("Anna")).await.unwrap();
        let b = chat::create_chat(pool, &site.id, "visitor-b", None).await.unwrap();
        let c = chat::create_chat(pool, &site.id, "visitor-c", None).await.unwrap();

        chat::create_message(pool, &a.id, Direction::Visitor, "hi").await.unwrap();
        chat::create_message(pool, &a.id, Direction::Visitor, "anyone?").await.unwrap();
        chat::create_message(pool, &b.id, Direction::Visitor, "hello").await.unwrap();
        chat::create_message(pool, &c.id, Direction::Operator, "welcome").await.unwrap();

        // Two conversations, not three messages
        assert_eq!(chat::unread_conversation_count(pool, &site.id).await.unwrap(), 2);

        chat::mark_chat_read(pool, &b.id).await.unwrap();
        assert_eq!(chat::unread_conversation_count(pool, &site.id).await.unwrap(), 1);

        chat::set_chat_status(pool, &a.id, ChatStatus::Abandoned).await.unwrap();
        assert_eq!(chat::unread_conversation_count(pool, &site.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unread_visitor_messages_in_order() {
        let db = test_db().await;
        let site = seed_site(&db).await;
        let pool = db.pool();

        let chat = chat::create_chat(pool, &site.id, "visitor-a", None).await.unwrap();
        chat::create_message(pool, &chat.id, Direction::Visitor, "first").await.unwrap();
        chat::create_message(pool, &chat.id, Direction::Operator, "reply").await.unwrap();
        chat::create_message(pool, &chat.id, Direction::Visitor, "second").await.unwrap();

        let unread = chat::unread_visitor_messages(pool, &chat.id).await.unwrap();
        let texts: Vec<_> = unread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        let latest = chat::latest_visitor_message(pool, &chat.id).await.unwrap().unwrap();
        assert_eq!(latest.text, "second");

        assert_eq!(chat::mark_chat_read(pool, &chat.id).await.unwrap(), 2);
        assert!(chat::unread_visitor_messages(pool, &chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bot_pairing_lifecycle() {
        let db = test_db().await;
        let site = seed_site(&db).await;
        let pool = db.pool();

        assert!(bot_pairing::get_pairing(pool, &site.id).await.unwrap().is_none());

        let pairing = bot_pairing::upsert_pairing(pool, &site.id, "shop_bot", "123:abc", "AB12CD")
            .await
            .unwrap();
        assert_eq!(pairing.connect_code, "AB12CD");
        assert!(!format!("{:?}", pairing).contains("123:abc"));

        bot_pairing::upsert_subscription(pool, &site.id, "1001", Some("olena"), Some("Olena"))
            .await
            .unwrap();
        bot_pairing::upsert_subscription(pool, &site.id, "1001", Some("olena"), Some("Olena"))
            .await
            .unwrap();
        bot_pairing::upsert_subscription(pool, &site.id, "1002", None, None)
            .await
            .unwrap();
        assert_eq!(bot_pairing::count_subscriptions(pool, &site.id).await.unwrap(), 2);

        // Re-setup swaps the code and keeps subscribers
        let pairing = bot_pairing::upsert_pairing(pool, &site.id, "shop_bot", "456:def", "ZZ99YY")
            .await
            .unwrap();
        assert_eq!(pairing.connect_code, "ZZ99YY");
        assert_eq!(pairing.bot_credential, "456:def");
        assert_eq!(bot_pairing::count_subscriptions(pool, &site.id).await.unwrap(), 2);

        assert!(bot_pairing::delete_pairing(pool, &site.id).await.unwrap());
        assert!(!bot_pairing::delete_pairing(pool, &site.id).await.unwrap());
        assert_eq!(bot_pairing::count_subscriptions(pool, &site.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_site_cascades() {
        let db = test_db().await;
        let site = seed_site(&db).await;
        let pool = db.pool();

        bot_pairing::upsert_pairing(pool, &site.id, "shop_bot", "123:abc", "AB12CD")
            .await
            .unwrap();
        site::delete_site(pool, &site.id).await.unwrap();

        assert!(bot_pairing::get_pairing(pool, &site.id).await.unwrap().is_none());
        assert!(matches!(
            site::get_notification_config(pool, &site.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
