//! Bot pairing and subscription operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{BotPairing, BotSubscription};

/// Create or replace the bot pairing of a site.
///
/// Replacing a pairing swaps the credential, username and connect code and
/// clears the webhook URL; existing subscriptions are kept.
pub async fn upsert_pairing(
    pool: &SqlitePool,
    site_id: &str,
    bot_username: &str,
    bot_credential: &str,
    connect_code: &str,
) -> Result<BotPairing> {
    sqlx::query(
        r#"
        INSERT INTO bot_pairings (site_id, bot_username, bot_credential, connect_code)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (site_id) DO UPDATE SET
            bot_username = excluded.bot_username,
            bot_credential = excluded.bot_credential,
            connect_code = excluded.connect_code,
            webhook_url = NULL,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        "#,
    )
    .bind(site_id)
    .bind(bot_username)
    .bind(bot_credential)
    .bind(connect_code)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "Site",
                    id: site_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_pairing(pool, site_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "BotPairing",
            id: site_id.to_string(),
        })
}

/// Get the bot pairing of a site, if one exists.
pub async fn get_pairing(pool: &SqlitePool, site_id: &str) -> Result<Option<BotPairing>> {
    let pairing = sqlx::query_as::<_, BotPairing>(
        r#"
        SELECT site_id, bot_username, bot_credential, connect_code, webhook_url,
               created_at, updated_at
        FROM bot_pairings
        WHERE site_id = ?
        "#,
    )
    .bind(site_id)
    .fetch_optional(pool)
    .await?;

    Ok(pairing)
}

/// Record the webhook URL registered for a pairing.
pub async fn set_webhook_url(pool: &SqlitePool, site_id: &str, webhook_url: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE bot_pairings
        SET webhook_url = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        WHERE site_id = ?
        "#,
    )
    .bind(webhook_url)
    .bind(site_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "BotPairing",
            id: site_id.to_string(),
        });
    }

    Ok(())
}

/// Delete the pairing of a site together with all its subscriptions.
///
/// Returns `false` if the site had no pairing.
pub async fn delete_pairing(pool: &SqlitePool, site_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM bot_pairings
        WHERE site_id = ?
        "#,
    )
    .bind(site_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Subscribe a bot chat to a site's notifications.
///
/// Re-subscribing the same chat refreshes its username and first name.
pub async fn upsert_subscription(
    pool: &SqlitePool,
    site_id: &str,
    account_ref: &str,
    username: Option<&str>,
    first_name: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bot_subscriptions (site_id, account_ref, username, first_name)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (site_id, account_ref) DO UPDATE SET
            username = excluded.username,
            first_name = excluded.first_name
        "#,
    )
    .bind(site_id)
    .bind(account_ref)
    .bind(username)
    .bind(first_name)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "BotPairing",
                    id: site_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// All subscriptions of a site, oldest first.
pub async fn list_subscriptions(pool: &SqlitePool, site_id: &str) -> Result<Vec<BotSubscription>> {
    let subscriptions = sqlx::query_as::<_, BotSubscription>(
        r#"
        SELECT site_id, account_ref, username, first_name, created_at
        FROM bot_subscriptions
        WHERE site_id = ?
        ORDER BY created_at, account_ref
        "#,
    )
    .bind(site_id)
    .fetch_all(pool)
    .await?;

    Ok(subscriptions)
}

/// Number of subscriptions of a site.
pub async fn count_subscriptions(pool: &SqlitePool, site_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM bot_subscriptions WHERE site_id = ?
        "#,
    )
    .bind(site_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
