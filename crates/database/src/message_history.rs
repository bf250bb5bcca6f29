//! Chat message audit log.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{MessageDirection, MessageEntry};

/// Fields for logging a message.
#[derive(Debug, Clone)]
pub struct NewMessageEntry {
    pub conversation_id: i64,
    pub phone: String,
    pub direction: MessageDirection,
    pub text: String,
    pub photo_count: i64,
    pub completed_intake: bool,
}

/// Append a message to the history.
pub async fn record(pool: &SqlitePool, entry: &NewMessageEntry, now: NaiveDateTime) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO message_history
            (conversation_id, phone, direction, text, photo_count, completed_intake, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.conversation_id)
    .bind(&entry.phone)
    .bind(entry.direction)
    .bind(&entry.text)
    .bind(entry.photo_count)
    .bind(entry.completed_intake)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// The most recent messages of a conversation, newest first.
pub async fn list_recent(
    pool: &SqlitePool,
    conversation_id: i64,
    limit: i64,
) -> Result<Vec<MessageEntry>> {
    let entries = sqlx::query_as::<_, MessageEntry>(
        r#"
        SELECT id, conversation_id, phone, direction, text, photo_count,
               completed_intake, created_at
        FROM message_history
        WHERE conversation_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
