//! Conversation state operations.
//!
//! Conversations are keyed by phone number and never deleted: staleness
//! closes them, new traffic reopens them.

use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Conversation, IntakeState};

/// Get the conversation for a phone number, if one exists.
pub async fn get_by_phone(pool: &SqlitePool, phone: &str) -> Result<Option<Conversation>> {
    let conversation = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, phone, driver_id, status, intake, last_greeting, last_message,
               idle_messages, active_request_id
        FROM conversations
        WHERE phone = ?
        "#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(conversation)
}

/// Get a conversation by ID.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, phone, driver_id, status, intake, last_greeting, last_message,
               idle_messages, active_request_id
        FROM conversations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Get the conversation for a phone number, creating it on first contact.
pub async fn get_or_create(
    pool: &SqlitePool,
    phone: &str,
    driver_id: Option<i64>,
    now: NaiveDateTime,
) -> Result<Conversation> {
    if let Some(existing) = get_by_phone(pool, phone).await? {
        return Ok(existing);
    }

    tracing::info!("Creating conversation for {}", phone);

    let result = sqlx::query(
        r#"
        INSERT INTO conversations (phone, driver_id, status, intake, last_message)
        VALUES (?, ?, 'active', ?, ?)
        "#,
    )
    .bind(phone)
    .bind(driver_id)
    .bind(Json(IntakeState::Initial))
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

/// Persist the intake step and bump the last-message timestamp.
///
/// Called on every flow invocation, including ones that stay in the same
/// step: the timestamp drives staleness maintenance.
pub async fn save_progress(
    pool: &SqlitePool,
    id: i64,
    intake: &IntakeState,
    now: NaiveDateTime,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET intake = ?, last_message = ?, status = 'active'
        WHERE id = ?
        "#,
    )
    .bind(Json(intake))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Record that a greeting was sent.
pub async fn record_greeting(pool: &SqlitePool, id: i64, now: NaiveDateTime) -> Result<()> {
    sqlx::query("UPDATE conversations SET last_greeting = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Finish an intake: link the created request and reset the dialogue.
pub async fn complete_intake(
    pool: &SqlitePool,
    id: i64,
    request_id: i64,
    now: NaiveDateTime,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET intake = ?, active_request_id = ?, idle_messages = 0, last_message = ?
        WHERE id = ?
        "#,
    )
    .bind(Json(IntakeState::Initial))
    .bind(request_id)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Unlink the active request (after approval, rejection or completion),
/// letting the driver start a new intake.
pub async fn clear_active_request_by_phone(pool: &SqlitePool, phone: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET active_request_id = NULL, status = 'active'
        WHERE phone = ?
        "#,
    )
    .bind(phone)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bump the idle-message counter (a message that did not report an issue).
pub async fn increment_idle(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE conversations SET idle_messages = idle_messages + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Close conversations idle since before `cutoff` that have no active
/// request. Returns how many were closed. Idempotent.
pub async fn close_stale(pool: &SqlitePool, cutoff: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET status = 'closed'
        WHERE last_message < ?
          AND status = 'active'
          AND active_request_id IS NULL
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// List conversations that still point at a request.
pub async fn list_with_active_request(pool: &SqlitePool) -> Result<Vec<Conversation>> {
    let conversations = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, phone, driver_id, status, intake, last_greeting, last_message,
               idle_messages, active_request_id
        FROM conversations
        WHERE active_request_id IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(conversations)
}

/// Fully reset a conversation (testing-only purge path).
pub async fn reset(pool: &SqlitePool, phone: &str, now: NaiveDateTime) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET status = 'active',
            intake = ?,
            active_request_id = NULL,
            idle_messages = 0,
            last_message = ?
        WHERE phone = ?
        "#,
    )
    .bind(Json(IntakeState::Initial))
    .bind(now)
    .bind(phone)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationStatus;
    use crate::Database;
    use chrono::NaiveDate;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = test_db().await;
        let first = get_or_create(db.pool(), "+56911112222", None, at(9, 0))
            .await
            .unwrap();
        let second = get_or_create(db.pool(), "+56911112222", None, at(10, 0))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.intake.0, IntakeState::Initial);
        assert_eq!(second.status, ConversationStatus::Active);
    }

    #[tokio::test]
    async fn test_save_progress_round_trips_state() {
        let db = test_db().await;
        let conv = get_or_create(db.pool(), "+56911112222", None, at(9, 0))
            .await
            .unwrap();

        let state = IntakeState::Confirmation {
            plate: "AB1234".to_string(),
            vehicle_id: None,
            problem: "frenos fallando".to_string(),
            photos: vec!["a.jpg".to_string()],
        };
        save_progress(db.pool(), conv.id, &state, at(9, 5))
            .await
            .unwrap();

        let reloaded = get(db.pool(), conv.id).await.unwrap();
        assert_eq!(reloaded.intake.0, state);
        assert_eq!(reloaded.last_message, Some(at(9, 5)));
    }

    #[tokio::test]
    async fn test_complete_intake_links_request_and_resets() {
        let db = test_db().await;
        let conv = get_or_create(db.pool(), "+56911112222", None, at(9, 0))
            .await
            .unwrap();
        let request = crate::request::create_request(
            db.pool(),
            &crate::request::NewRequest::chat_intake(
                "+56911112222",
                "frenos fallando",
                Vec::new(),
                None,
                None,
            ),
            at(9, 10),
        )
        .await
        .unwrap();

        increment_idle(db.pool(), conv.id).await.unwrap();
        complete_intake(db.pool(), conv.id, request.id, at(9, 10))
            .await
            .unwrap();

        let reloaded = get(db.pool(), conv.id).await.unwrap();
        assert_eq!(reloaded.active_request_id, Some(request.id));
        assert_eq!(reloaded.idle_messages, 0);
        assert_eq!(reloaded.intake.0, IntakeState::Initial);

        clear_active_request_by_phone(db.pool(), "+56911112222")
            .await
            .unwrap();
        let cleared = get(db.pool(), conv.id).await.unwrap();
        assert_eq!(cleared.active_request_id, None);
    }

    #[tokio::test]
    async fn test_close_stale_skips_active_requests() {
        let db = test_db().await;
        let idle = get_or_create(db.pool(), "+56911110000", None, at(8, 0))
            .await
            .unwrap();
        let busy = get_or_create(db.pool(), "+56911110001", None, at(8, 0))
            .await
            .unwrap();
        let request = crate::request::create_request(
            db.pool(),
            &crate::request::NewRequest::chat_intake(
                "+56911110001",
                "ruido en motor",
                Vec::new(),
                None,
                None,
            ),
            at(8, 5),
        )
        .await
        .unwrap();
        complete_intake(db.pool(), busy.id, request.id, at(8, 5))
            .await
            .unwrap();

        let closed = close_stale(db.pool(), at(12, 0)).await.unwrap();
        assert_eq!(closed, 1);

        let idle = get(db.pool(), idle.id).await.unwrap();
        assert_eq!(idle.status, ConversationStatus::Closed);
        let busy = get(db.pool(), busy.id).await.unwrap();
        assert_eq!(busy.status, ConversationStatus::Active);

        // Running again closes nothing further.
        assert_eq!(close_stale(db.pool(), at(12, 0)).await.unwrap(), 0);
    }
}
