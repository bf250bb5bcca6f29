//! Appointment CRUD and availability queries.
//!
//! The booking invariant lives here: a partial unique index on
//! (mechanic, date, time) over live states makes the insert the single
//! serialization point, so concurrent approvals cannot double-book even
//! though the slot search is check-then-act.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Appointment, AppointmentOrigin, AppointmentStatus};

/// Fields for booking an appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub request_id: i64,
    pub mechanic_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i64,
    pub origin: AppointmentOrigin,
    pub notes: Option<String>,
}

/// Book an appointment in `scheduled` state.
///
/// Returns `Conflict` if the (mechanic, date, time) slot is already held by
/// a live appointment.
pub async fn create_appointment(
    pool: &SqlitePool,
    appointment: &NewAppointment,
) -> Result<Appointment> {
    let result = sqlx::query(
        r#"
        INSERT INTO appointments
            (request_id, mechanic_id, date, time, duration_minutes, status, origin, notes)
        VALUES (?, ?, ?, ?, ?, 'scheduled', ?, ?)
        "#,
    )
    .bind(appointment.request_id)
    .bind(appointment.mechanic_id)
    .bind(appointment.date)
    .bind(&appointment.time)
    .bind(appointment.duration_minutes)
    .bind(appointment.origin)
    .bind(&appointment.notes)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::Conflict {
                    detail: format!(
                        "mechanic {} already booked at {} {}",
                        appointment.mechanic_id, appointment.date, appointment.time
                    ),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_appointment(pool, result.last_insert_rowid()).await
}

/// Get an appointment by ID.
pub async fn get_appointment(pool: &SqlitePool, id: i64) -> Result<Appointment> {
    sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, request_id, mechanic_id, date, time, duration_minutes, status,
               origin, notes
        FROM appointments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Appointment",
        id: id.to_string(),
    })
}

/// Whether a live appointment holds the given (mechanic, date, time) slot.
pub async fn exists_active_at(
    pool: &SqlitePool,
    mechanic_id: i64,
    date: NaiveDate,
    time: &str,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM appointments
        WHERE mechanic_id = ? AND date = ? AND time = ?
          AND status IN ('scheduled', 'confirmed', 'in_progress')
        "#,
    )
    .bind(mechanic_id)
    .bind(date)
    .bind(time)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Count a mechanic's live appointments dated within [from, to] inclusive.
pub async fn count_active_between(
    pool: &SqlitePool,
    mechanic_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM appointments
        WHERE mechanic_id = ? AND date BETWEEN ? AND ?
          AND status IN ('scheduled', 'confirmed', 'in_progress')
        "#,
    )
    .bind(mechanic_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List appointments dated within [from, to] inclusive, ordered by date
/// then slot. Pass a mechanic to restrict to their agenda.
pub async fn list_between(
    pool: &SqlitePool,
    from: NaiveDate,
    to: NaiveDate,
    mechanic_id: Option<i64>,
) -> Result<Vec<Appointment>> {
    let appointments = match mechanic_id {
        Some(mechanic_id) => {
            sqlx::query_as::<_, Appointment>(
                r#"
                SELECT id, request_id, mechanic_id, date, time, duration_minutes, status,
                       origin, notes
                FROM appointments
                WHERE date BETWEEN ? AND ? AND mechanic_id = ?
                ORDER BY date, time
                "#,
            )
            .bind(from)
            .bind(to)
            .bind(mechanic_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Appointment>(
                r#"
                SELECT id, request_id, mechanic_id, date, time, duration_minutes, status,
                       origin, notes
                FROM appointments
                WHERE date BETWEEN ? AND ?
                ORDER BY date, time
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(appointments)
}

/// A mechanic's agenda for one day, ordered by slot.
pub async fn list_for_mechanic_on(
    pool: &SqlitePool,
    mechanic_id: i64,
    date: NaiveDate,
) -> Result<Vec<Appointment>> {
    list_between(pool, date, date, Some(mechanic_id)).await
}

/// Get the appointment linked to a request, if any.
pub async fn get_by_request(pool: &SqlitePool, request_id: i64) -> Result<Option<Appointment>> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, request_id, mechanic_id, date, time, duration_minutes, status,
               origin, notes
        FROM appointments
        WHERE request_id = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

/// Update the lifecycle state of an appointment.
pub async fn set_status(pool: &SqlitePool, id: i64, status: AppointmentStatus) -> Result<()> {
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Appointment",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{create_request, NewRequest};
    use crate::user::{create_user, NewUser};
    use crate::{Database, Role};
    use chrono::{NaiveDateTime, NaiveDate};

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        day(10).and_hms_opt(9, 0, 0).unwrap()
    }

    async fn seed(db: &Database) -> (i64, i64) {
        let mechanic = create_user(
            db.pool(),
            &NewUser {
                name: "Pedro".to_string(),
                phone: None,
                role: Role::Mechanic,
                active: true,
            },
        )
        .await
        .unwrap();
        let request = create_request(
            db.pool(),
            &NewRequest::chat_intake("+56911112222", "frenos", Vec::new(), None, None),
            now(),
        )
        .await
        .unwrap();
        (mechanic.id, request.id)
    }

    fn booking(request_id: i64, mechanic_id: i64, date: NaiveDate, time: &str) -> NewAppointment {
        NewAppointment {
            request_id,
            mechanic_id,
            date,
            time: time.to_string(),
            duration_minutes: 30,
            origin: AppointmentOrigin::Automatic,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_double_booking_is_conflict() {
        let db = test_db().await;
        let (mechanic_id, request_id) = seed(&db).await;

        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:00"))
            .await
            .unwrap();

        let err = create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let db = test_db().await;
        let (mechanic_id, request_id) = seed(&db).await;

        let first = create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:00"))
            .await
            .unwrap();
        set_status(db.pool(), first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        assert!(!exists_active_at(db.pool(), mechanic_id, day(10), "08:00")
            .await
            .unwrap());
        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_count_active_between_is_inclusive() {
        let db = test_db().await;
        let (mechanic_id, request_id) = seed(&db).await;

        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:00"))
            .await
            .unwrap();
        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(17), "08:00"))
            .await
            .unwrap();
        // Outside the window
        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(18), "08:00"))
            .await
            .unwrap();

        let count = count_active_between(db.pool(), mechanic_id, day(10), day(17))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_list_between_orders_by_date_then_time() {
        let db = test_db().await;
        let (mechanic_id, request_id) = seed(&db).await;

        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(11), "08:00"))
            .await
            .unwrap();
        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "14:30"))
            .await
            .unwrap();
        create_appointment(db.pool(), &booking(request_id, mechanic_id, day(10), "08:30"))
            .await
            .unwrap();

        let all = list_between(db.pool(), day(10), day(11), None).await.unwrap();
        let slots: Vec<_> = all.iter().map(|a| (a.date, a.time.as_str())).collect();
        assert_eq!(
            slots,
            vec![
                (day(10), "08:30"),
                (day(10), "14:30"),
                (day(11), "08:00"),
            ]
        );
    }
}
