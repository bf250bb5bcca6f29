//! Work order CRUD operations.

use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{WorkOrder, WorkOrderStatus};

/// Fields for creating a work order.
#[derive(Debug, Clone)]
pub struct NewWorkOrder {
    pub request_id: i64,
    pub mechanic_id: Option<i64>,
    pub supervisor_id: Option<i64>,
    pub notes: Option<String>,
}

/// Completed-work report recorded by the mechanic.
#[derive(Debug, Clone, Default)]
pub struct WorkReport {
    pub diagnosis: Option<String>,
    pub work_performed: Option<String>,
    pub parts_used: Vec<String>,
    pub total_cost: f64,
    pub work_hours: f64,
}

/// Create the work order for a request.
///
/// A request gets exactly one work order; a second insert trips the unique
/// constraint and is reported as `AlreadyExists`.
pub async fn create_work_order(
    pool: &SqlitePool,
    order: &NewWorkOrder,
    now: NaiveDateTime,
) -> Result<WorkOrder> {
    let result = sqlx::query(
        r#"
        INSERT INTO work_orders
            (request_id, mechanic_id, supervisor_id, assigned_at, status)
        VALUES (?, ?, ?, ?, 'assigned')
        "#,
    )
    .bind(order.request_id)
    .bind(order.mechanic_id)
    .bind(order.supervisor_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "WorkOrder",
                    id: format!("request {}", order.request_id),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    let id = result.last_insert_rowid();

    if let Some(notes) = &order.notes {
        sqlx::query("UPDATE work_orders SET notes = ? WHERE id = ?")
            .bind(notes)
            .bind(id)
            .execute(pool)
            .await?;
    }

    get_work_order(pool, id).await
}

/// Get a work order by ID.
pub async fn get_work_order(pool: &SqlitePool, id: i64) -> Result<WorkOrder> {
    sqlx::query_as::<_, WorkOrder>(
        r#"
        SELECT id, request_id, mechanic_id, supervisor_id, assigned_at, started_at,
               finished_at, diagnosis, work_performed, parts_used, total_cost,
               work_hours, status, notes
        FROM work_orders
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "WorkOrder",
        id: id.to_string(),
    })
}

/// Get the work order linked to a request, if any.
pub async fn get_by_request(pool: &SqlitePool, request_id: i64) -> Result<Option<WorkOrder>> {
    let order = sqlx::query_as::<_, WorkOrder>(
        r#"
        SELECT id, request_id, mechanic_id, supervisor_id, assigned_at, started_at,
               finished_at, diagnosis, work_performed, parts_used, total_cost,
               work_hours, status, notes
        FROM work_orders
        WHERE request_id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

/// Whether a request already has a work order.
pub async fn exists_for_request(pool: &SqlitePool, request_id: i64) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM work_orders WHERE request_id = ?")
        .bind(request_id)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

/// Update the lifecycle state, stamping start/finish timestamps as the
/// order moves.
pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: WorkOrderStatus,
    now: NaiveDateTime,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE work_orders
        SET status = ?,
            started_at = CASE WHEN ? = 'in_progress' AND started_at IS NULL
                              THEN ? ELSE started_at END,
            finished_at = CASE WHEN ? IN ('completed', 'cancelled')
                               THEN ? ELSE finished_at END
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(status)
    .bind(now)
    .bind(status)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "WorkOrder",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Record the mechanic's report on the order.
pub async fn record_work(pool: &SqlitePool, id: i64, report: &WorkReport) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE work_orders
        SET diagnosis = COALESCE(?, diagnosis),
            work_performed = COALESCE(?, work_performed),
            parts_used = ?,
            total_cost = ?,
            work_hours = ?
        WHERE id = ?
        "#,
    )
    .bind(&report.diagnosis)
    .bind(&report.work_performed)
    .bind(Json(&report.parts_used))
    .bind(report.total_cost)
    .bind(report.work_hours)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "WorkOrder",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{create_request, NewRequest};
    use crate::Database;
    use chrono::NaiveDate;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    async fn seed_request(db: &Database) -> i64 {
        create_request(
            db.pool(),
            &NewRequest::chat_intake("+56911112222", "frenos", Vec::new(), None, None),
            now(),
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_one_work_order_per_request() {
        let db = test_db().await;
        let request_id = seed_request(&db).await;

        let order = NewWorkOrder {
            request_id,
            mechanic_id: None,
            supervisor_id: None,
            notes: Some("Orden creada automáticamente".to_string()),
        };
        let created = create_work_order(db.pool(), &order, now()).await.unwrap();
        assert_eq!(created.status, WorkOrderStatus::Assigned);
        assert_eq!(created.notes.as_deref(), Some("Orden creada automáticamente"));

        let err = create_work_order(db.pool(), &order, now()).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::AlreadyExists {
                entity: "WorkOrder",
                ..
            }
        ));
        assert!(exists_for_request(db.pool(), request_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_transitions_stamp_timestamps() {
        let db = test_db().await;
        let request_id = seed_request(&db).await;
        let order = create_work_order(
            db.pool(),
            &NewWorkOrder {
                request_id,
                mechanic_id: None,
                supervisor_id: None,
                notes: None,
            },
            now(),
        )
        .await
        .unwrap();

        set_status(db.pool(), order.id, WorkOrderStatus::InProgress, now())
            .await
            .unwrap();
        let started = get_work_order(db.pool(), order.id).await.unwrap();
        assert_eq!(started.status, WorkOrderStatus::InProgress);
        assert!(started.started_at.is_some());
        assert!(started.finished_at.is_none());

        set_status(db.pool(), order.id, WorkOrderStatus::Completed, now())
            .await
            .unwrap();
        let finished = get_work_order(db.pool(), order.id).await.unwrap();
        assert!(finished.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_record_work() {
        let db = test_db().await;
        let request_id = seed_request(&db).await;
        let order = create_work_order(
            db.pool(),
            &NewWorkOrder {
                request_id,
                mechanic_id: None,
                supervisor_id: None,
                notes: None,
            },
            now(),
        )
        .await
        .unwrap();

        record_work(
            db.pool(),
            order.id,
            &WorkReport {
                diagnosis: Some("Pastillas gastadas".to_string()),
                work_performed: Some("Cambio de pastillas".to_string()),
                parts_used: vec!["pastillas delanteras".to_string()],
                total_cost: 85000.0,
                work_hours: 1.5,
            },
        )
        .await
        .unwrap();

        let reloaded = get_work_order(db.pool(), order.id).await.unwrap();
        assert_eq!(reloaded.work_hours, 1.5);
        assert_eq!(reloaded.parts_used.0.len(), 1);
    }
}
