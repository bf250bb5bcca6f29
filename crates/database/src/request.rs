//! Maintenance request CRUD operations.

use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::SqlitePool;
use workshop_core::{Classification, IssueType, Priority};

use crate::error::{DatabaseError, Result};
use crate::models::{MaintenanceRequest, RequestStatus};

/// Fields for creating a request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub phone: Option<String>,
    pub description: String,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub photos: Vec<String>,
}

impl NewRequest {
    /// A request as produced by a completed chat intake, before
    /// classification runs.
    pub fn chat_intake(
        phone: &str,
        description: &str,
        photos: Vec<String>,
        driver_id: Option<i64>,
        vehicle_id: Option<i64>,
    ) -> Self {
        Self {
            driver_id,
            vehicle_id,
            phone: Some(phone.to_string()),
            description: description.to_string(),
            issue_type: IssueType::WorkshopIntake,
            priority: Priority::Medium,
            photos,
        }
    }
}

/// Supervisor corrections applied to a rejected request.
#[derive(Debug, Clone, Default)]
pub struct RequestEdit {
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    pub vehicle_id: Option<i64>,
    pub supervisor_notes: Option<String>,
}

/// Create a new pending request.
pub async fn create_request(
    pool: &SqlitePool,
    request: &NewRequest,
    now: NaiveDateTime,
) -> Result<MaintenanceRequest> {
    let result = sqlx::query(
        r#"
        INSERT INTO requests
            (driver_id, vehicle_id, phone, description, issue_type, priority,
             status, photos, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(request.driver_id)
    .bind(request.vehicle_id)
    .bind(&request.phone)
    .bind(&request.description)
    .bind(request.issue_type.as_str())
    .bind(request.priority.as_str())
    .bind(Json(&request.photos))
    .bind(now)
    .execute(pool)
    .await?;

    get_request(pool, result.last_insert_rowid()).await
}

/// Get a request by ID.
pub async fn get_request(pool: &SqlitePool, id: i64) -> Result<MaintenanceRequest> {
    sqlx::query_as::<_, MaintenanceRequest>(
        r#"
        SELECT id, driver_id, vehicle_id, phone, description, issue_type, priority,
               status, photos, classification, supervisor_notes, created_at
        FROM requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Request",
        id: id.to_string(),
    })
}

/// Store a classifier verdict on the request.
pub async fn apply_classification(
    pool: &SqlitePool,
    id: i64,
    classification: &Classification,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET issue_type = ?, priority = ?, classification = ?
        WHERE id = ?
        "#,
    )
    .bind(classification.issue_type.as_str())
    .bind(classification.priority.as_str())
    .bind(Json(classification))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Request",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Update the lifecycle state, optionally recording supervisor notes.
pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: RequestStatus,
    supervisor_notes: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?, supervisor_notes = COALESCE(?, supervisor_notes)
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(supervisor_notes)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Request",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Patch fields of a request. Absent fields keep their value; the status is
/// never touched here.
pub async fn update_fields(pool: &SqlitePool, id: i64, edit: &RequestEdit) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET issue_type = COALESCE(?, issue_type),
            priority = COALESCE(?, priority),
            description = COALESCE(?, description),
            vehicle_id = COALESCE(?, vehicle_id),
            supervisor_notes = COALESCE(?, supervisor_notes)
        WHERE id = ?
        "#,
    )
    .bind(edit.issue_type.map(|t| t.as_str()))
    .bind(edit.priority.map(|p| p.as_str()))
    .bind(&edit.description)
    .bind(edit.vehicle_id)
    .bind(&edit.supervisor_notes)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Request",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// List requests in a given state, newest first.
pub async fn list_by_status(
    pool: &SqlitePool,
    status: RequestStatus,
) -> Result<Vec<MaintenanceRequest>> {
    let requests = sqlx::query_as::<_, MaintenanceRequest>(
        r#"
        SELECT id, driver_id, vehicle_id, phone, description, issue_type, priority,
               status, photos, classification, supervisor_notes, created_at
        FROM requests
        WHERE status = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// Hard-delete a request. Only the testing purge path uses this; production
/// flows move requests through terminal states instead.
pub async fn delete_request(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM requests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Request",
            id: id.to_string(),
        });
    }

    Ok(())
}
