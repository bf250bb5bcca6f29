//! Background conversation maintenance.

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use database::{conversation, request, Database, DatabaseError};

use crate::error::DispatchError;

/// What a maintenance pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    /// Conversations marked closed for inactivity.
    pub closed: u64,
    /// Active-request links cleared because the request finished.
    pub cleared: u64,
}

/// Close idle conversations and clear finished request links.
///
/// Conversations are never deleted, only marked closed; a conversation
/// whose request reached a terminal state is reactivated so the driver can
/// report again. Safe to run concurrently with live traffic and repeatedly:
/// both passes only touch rows matching strict staleness predicates.
pub async fn run_maintenance(
    db: &Database,
    stale_after: Duration,
    now: NaiveDateTime,
) -> Result<MaintenanceReport, DispatchError> {
    let cutoff = now - stale_after;
    let closed = conversation::close_stale(db.pool(), cutoff).await?;

    let mut cleared = 0;
    for conv in conversation::list_with_active_request(db.pool()).await? {
        let Some(request_id) = conv.active_request_id else {
            continue;
        };

        let finished = match request::get_request(db.pool(), request_id).await {
            Ok(request) => request.status.is_terminal(),
            Err(DatabaseError::NotFound { .. }) => true,
            Err(e) => return Err(e.into()),
        };

        if finished {
            conversation::clear_active_request_by_phone(db.pool(), &conv.phone).await?;
            cleared += 1;
        }
    }

    info!(
        "Conversation maintenance: {} closed, {} request links cleared",
        closed, cleared
    );

    Ok(MaintenanceReport { closed, cleared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use database::request::NewRequest;
    use database::{ConversationStatus, RequestStatus};

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_closes_idle_and_clears_finished() {
        let db = test_db().await;

        // Idle conversation with no request: will be closed.
        let idle = conversation::get_or_create(db.pool(), "+56911110000", None, at(0))
            .await
            .unwrap();

        // Conversation with a completed request: link will be cleared.
        let done = conversation::get_or_create(db.pool(), "+56911110001", None, at(0))
            .await
            .unwrap();
        let request = request::create_request(
            db.pool(),
            &NewRequest::chat_intake("+56911110001", "listo", Vec::new(), None, None),
            at(0),
        )
        .await
        .unwrap();
        conversation::complete_intake(db.pool(), done.id, request.id, at(0))
            .await
            .unwrap();
        request::set_status(db.pool(), request.id, RequestStatus::Completed, None)
            .await
            .unwrap();

        // Conversation with a pending request: untouched.
        let busy = conversation::get_or_create(db.pool(), "+56911110002", None, at(0))
            .await
            .unwrap();
        let open_request = request::create_request(
            db.pool(),
            &NewRequest::chat_intake("+56911110002", "pendiente", Vec::new(), None, None),
            at(0),
        )
        .await
        .unwrap();
        conversation::complete_intake(db.pool(), busy.id, open_request.id, at(0))
            .await
            .unwrap();

        let report = run_maintenance(&db, Duration::hours(24), at(0) + Duration::hours(30))
            .await
            .unwrap();
        assert_eq!(report.closed, 1);
        assert_eq!(report.cleared, 1);

        let idle = conversation::get(db.pool(), idle.id).await.unwrap();
        assert_eq!(idle.status, ConversationStatus::Closed);

        let done = conversation::get(db.pool(), done.id).await.unwrap();
        assert_eq!(done.active_request_id, None);
        assert_eq!(done.status, ConversationStatus::Active);

        let busy = conversation::get(db.pool(), busy.id).await.unwrap();
        assert_eq!(busy.active_request_id, Some(open_request.id));

        // Second pass: the cleared conversation is now idle with no request,
        // so it gets closed; nothing else changes.
        let again = run_maintenance(&db, Duration::hours(24), at(0) + Duration::hours(30))
            .await
            .unwrap();
        assert_eq!(again.closed, 1);
        assert_eq!(again.cleared, 0);

        // Third pass converges.
        let third = run_maintenance(&db, Duration::hours(24), at(0) + Duration::hours(30))
            .await
            .unwrap();
        assert_eq!(third, MaintenanceReport::default());
    }
}
