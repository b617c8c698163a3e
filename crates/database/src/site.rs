//! Site (tenant) and notification config operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NotificationConfig, Site};
use crate::validation::validate_notification_config;

/// Create a new site with notifications disabled.
pub async fn create_site(pool: &SqlitePool, site: &Site) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sites (id, name, domain, owner_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&site.id)
    .bind(&site.name)
    .bind(&site.domain)
    .bind(&site.owner_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Site",
                    id: site.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a site by ID.
pub async fn get_site(pool: &SqlitePool, id: &str) -> Result<Site> {
    sqlx::query_as::<_, Site>(
        r#"
        SELECT id, name, domain, owner_id
        FROM sites
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Site",
        id: id.to_string(),
    })
}

/// Delete a site. Notification config, bot pairing and chats go with it.
pub async fn delete_site(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM sites
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Site",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Get the notification config for a site.
pub async fn get_notification_config(pool: &SqlitePool, site_id: &str) -> Result<NotificationConfig> {
    sqlx::query_as::<_, NotificationConfig>(
        r#"
        SELECT id AS site_id, notification_email, email_fallback_enabled,
               email_fallback_address, email_fallback_timeout_minutes
        FROM sites
        WHERE id = ?
        "#,
    )
    .bind(site_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Site",
        id: site_id.to_string(),
    })
}

/// Update the notification config for a site.
///
/// The timeout must be within 1..=60 minutes and any addresses must be
/// well-formed; invalid configs are rejected without touching the row.
pub async fn update_notification_config(pool: &SqlitePool, config: &NotificationConfig) -> Result<()> {
    validate_notification_config(config)?;

    let result = sqlx::query(
        r#"
        UPDATE sites
        SET notification_email = ?,
            email_fallback_enabled = ?,
            email_fallback_address = ?,
            email_fallback_timeout_minutes = ?
        WHERE id = ?
        "#,
    )
    .bind(&config.notification_email)
    .bind(config.email_fallback_enabled)
    .bind(&config.email_fallback_address)
    .bind(config.email_fallback_timeout_minutes)
    .bind(&config.site_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Site",
            id: config.site_id.clone(),
        });
    }

    tracing::debug!(
        site_id = %config.site_id,
        enabled = config.email_fallback_enabled,
        timeout_minutes = config.email_fallback_timeout_minutes,
        "Updated notification config"
    );

    Ok(())
}
