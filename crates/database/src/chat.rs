//! Conversation and message operations.
//!
//! Conversations and messages are owned by the chat service; the
//! notification engine only reads them. The write helpers here exist for the
//! ingestion path and for tests.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Chat, ChatStatus, Direction, Message};

/// Create a new open conversation.
pub async fn create_chat(
    pool: &SqlitePool,
    site_id: &str,
    visitor_id: &str,
    visitor_name: Option<&str>,
) -> Result<Chat> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO chats (id, site_id, visitor_id, visitor_name, status)
        VALUES (?, ?, ?, ?, 'open')
        "#,
    )
    .bind(&id)
    .bind(site_id)
    .bind(visitor_id)
    .bind(visitor_name)
    .execute(pool)
    .await?;

    get_chat(pool, &id).await
}

/// Get a conversation by ID.
pub async fn get_chat(pool: &SqlitePool, id: &str) -> Result<Chat> {
    sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, site_id, visitor_id, visitor_name, status, created_at
        FROM chats
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Chat",
        id: id.to_string(),
    })
}

/// Move a conversation to a new lifecycle state.
pub async fn set_chat_status(pool: &SqlitePool, id: &str, status: ChatStatus) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE chats
        SET status = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Chat",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Append a message to a conversation.
pub async fn create_message(
    pool: &SqlitePool,
    chat_id: &str,
    direction: Direction,
    text: &str,
) -> Result<Message> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO messages (id, chat_id, direction, text)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(chat_id)
    .bind(direction)
    .bind(text)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "Chat",
                    id: chat_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, direction, text, read, created_at
        FROM messages
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::from)
}

/// Unread visitor messages of a conversation, oldest first.
pub async fn unread_visitor_messages(pool: &SqlitePool, chat_id: &str) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, direction, text, read, created_at
        FROM messages
        WHERE chat_id = ? AND direction = 'visitor' AND read = 0
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// The most recent visitor message of a conversation, if any.
pub async fn latest_visitor_message(pool: &SqlitePool, chat_id: &str) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, direction, text, read, created_at
        FROM messages
        WHERE chat_id = ? AND direction = 'visitor'
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

/// Mark every visitor message in a conversation as read.
///
/// Returns the number of messages that changed state.
pub async fn mark_chat_read(pool: &SqlitePool, chat_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET read = 1
        WHERE chat_id = ? AND direction = 'visitor' AND read = 0
        "#,
    )
    .bind(chat_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Number of open conversations of a site with at least one unread visitor message.
pub async fn unread_conversation_count(pool: &SqlitePool, site_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM chats c
        WHERE c.site_id = ?
          AND c.status = 'open'
          AND EXISTS (SELECT 1 FROM messages m
                      WHERE m.chat_id = c.id AND m.direction = 'visitor' AND m.read = 0)
        "#,
    )
    .bind(site_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
