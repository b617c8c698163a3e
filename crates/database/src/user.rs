//! Operator account and site membership operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Create a new user.
pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: user.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Add a user as an operator of a site. Adding twice is a no-op.
pub async fn add_operator(pool: &SqlitePool, site_id: &str, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO site_operators (site_id, user_id)
        VALUES (?, ?)
        ON CONFLICT (site_id, user_id) DO NOTHING
        "#,
    )
    .bind(site_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a user from a site's operators.
pub async fn remove_operator(pool: &SqlitePool, site_id: &str, user_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM site_operators
        WHERE site_id = ? AND user_id = ?
        "#,
    )
    .bind(site_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Operator",
            id: format!("{}/{}", site_id, user_id),
        });
    }

    Ok(())
}

/// Whether a user is the owner or an operator of a site.
pub async fn has_site_access(pool: &SqlitePool, site_id: &str, user_id: &str) -> Result<bool> {
    let result = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM sites s
        WHERE s.id = ?
          AND (s.owner_id = ?
               OR EXISTS (SELECT 1 FROM site_operators o
                          WHERE o.site_id = s.id AND o.user_id = ?))
        "#,
    )
    .bind(site_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.is_some())
}

/// Email addresses of the site owner followed by every operator.
///
/// Users without an email are skipped and duplicates are removed while
/// preserving order (owner first).
pub async fn site_recipient_emails(pool: &SqlitePool, site_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        r#"
        SELECT u.email
        FROM sites s
        INNER JOIN users u ON u.id = s.owner_id
        WHERE s.id = ? AND u.email IS NOT NULL AND u.email != ''
        UNION ALL
        SELECT email FROM (
            SELECT u.email AS email
            FROM site_operators o
            INNER JOIN users u ON u.id = o.user_id
            WHERE o.site_id = ? AND u.email IS NOT NULL AND u.email != ''
            ORDER BY o.created_at, u.id
        )
        "#,
    )
    .bind(site_id)
    .bind(site_id)
    .fetch_all(pool)
    .await?;

    let mut seen = std::collections::HashSet::new();
    Ok(rows
        .into_iter()
        .filter(|email| seen.insert(email.to_lowercase()))
        .collect())
}
