//! Calendar projections for the dashboard.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use database::{appointment, user, Appointment, Database, Role, User};

use crate::error::ScheduleError;

/// Live appointments filling a full 8-hour day (16 half-hour slots).
const BUSY_SLOT_COUNT: usize = 16;
/// Live appointments filling half a day.
const PARTIAL_SLOT_COUNT: usize = 8;

/// Coarse load level for a mechanic's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Partial,
    Busy,
}

impl Availability {
    fn from_active_count(count: usize) -> Self {
        if count >= BUSY_SLOT_COUNT {
            Availability::Busy
        } else if count >= PARTIAL_SLOT_COUNT {
            Availability::Partial
        } else {
            Availability::Available
        }
    }
}

/// One day bucket of the weekly view.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    /// Weekday name as shown in the UI.
    pub weekday: &'static str,
    pub date: NaiveDate,
    pub appointments: Vec<Appointment>,
}

/// One mechanic's row in the team view.
#[derive(Debug, Clone, Serialize)]
pub struct MechanicDay {
    pub mechanic: User,
    pub appointments: Vec<Appointment>,
    pub availability: Availability,
    pub busy_hours: f64,
}

/// Spanish weekday name.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Lunes",
        Weekday::Tue => "Martes",
        Weekday::Wed => "Miércoles",
        Weekday::Thu => "Jueves",
        Weekday::Fri => "Viernes",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

/// The Monday of the week containing `date`.
pub fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Appointments for the 7 days starting at `start`, bucketed by date.
///
/// Every day bucket is present even when empty. Mechanics only see their own
/// appointments; other roles see the whole workshop.
pub async fn weekly_view(
    db: &Database,
    start: NaiveDate,
    caller_role: Role,
    mechanic_id: Option<i64>,
) -> Result<BTreeMap<NaiveDate, DaySchedule>, ScheduleError> {
    let own_only = if caller_role == Role::Mechanic {
        mechanic_id
    } else {
        None
    };

    let end = start + Duration::days(6);
    let appointments = appointment::list_between(db.pool(), start, end, own_only).await?;

    let mut calendar: BTreeMap<NaiveDate, DaySchedule> = BTreeMap::new();
    for offset in 0..7 {
        let date = start + Duration::days(offset);
        calendar.insert(
            date,
            DaySchedule {
                weekday: weekday_name(date),
                date,
                appointments: Vec::new(),
            },
        );
    }

    for appointment in appointments {
        if let Some(day) = calendar.get_mut(&appointment.date) {
            day.appointments.push(appointment);
        }
    }

    Ok(calendar)
}

/// Per-mechanic load overview for a single date, covering every active
/// mechanic.
pub async fn team_view(db: &Database, date: NaiveDate) -> Result<Vec<MechanicDay>, ScheduleError> {
    let mechanics = user::list_active_mechanics(db.pool()).await?;

    let mut team = Vec::with_capacity(mechanics.len());
    for mechanic in mechanics {
        let appointments =
            appointment::list_for_mechanic_on(db.pool(), mechanic.id, date).await?;
        let active = appointments
            .iter()
            .filter(|a| a.status.is_active())
            .count();

        team.push(MechanicDay {
            availability: Availability::from_active_count(active),
            busy_hours: (active as f64 * 0.5 * 10.0).round() / 10.0,
            appointments,
            mechanic,
        });
    }

    Ok(team)
}

/// A mechanic's agenda for one day, ordered by slot.
pub async fn mechanic_day(
    db: &Database,
    mechanic_id: i64,
    date: NaiveDate,
) -> Result<Vec<Appointment>, ScheduleError> {
    Ok(appointment::list_for_mechanic_on(db.pool(), mechanic_id, date).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use database::appointment::NewAppointment;
    use database::request::{create_request, NewRequest};
    use database::user::{create_user, NewUser};
    use database::AppointmentOrigin;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn now() -> NaiveDateTime {
        monday().and_hms_opt(9, 0, 0).unwrap()
    }

    async fn mechanic(db: &Database, name: &str) -> User {
        create_user(
            db.pool(),
            &NewUser {
                name: name.to_string(),
                phone: None,
                role: Role::Mechanic,
                active: true,
            },
        )
        .await
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

    async fn book(db: &Database, request_id: i64, mechanic_id: i64, date: NaiveDate, time: &str) {
        appointment::create_appointment(
            db.pool(),
            &NewAppointment {
                request_id,
                mechanic_id,
                date,
                time: time.to_string(),
                duration_minutes: 30,
                origin: AppointmentOrigin::Automatic,
                notes: None,
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn test_monday_of_week() {
        // 2025-03-13 is a Thursday, 2025-03-16 a Sunday.
        let thursday = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        assert_eq!(monday_of_week(thursday), monday());
        assert_eq!(monday_of_week(sunday), monday());
        assert_eq!(monday_of_week(monday()), monday());
    }

    #[test]
    fn test_availability_thresholds() {
        assert_eq!(Availability::from_active_count(0), Availability::Available);
        assert_eq!(Availability::from_active_count(7), Availability::Available);
        assert_eq!(Availability::from_active_count(8), Availability::Partial);
        assert_eq!(Availability::from_active_count(15), Availability::Partial);
        assert_eq!(Availability::from_active_count(16), Availability::Busy);
    }

    #[tokio::test]
    async fn test_weekly_view_has_all_seven_buckets() {
        let db = test_db().await;
        let pedro = mechanic(&db, "Pedro").await;
        let request_id = seed_request(&db).await;
        book(&db, request_id, pedro.id, monday(), "08:00").await;
        book(&db, request_id, pedro.id, monday() + Duration::days(2), "14:00").await;
        // Outside the week
        book(&db, request_id, pedro.id, monday() + Duration::days(9), "08:00").await;

        let calendar = weekly_view(&db, monday(), Role::Supervisor, None)
            .await
            .unwrap();

        assert_eq!(calendar.len(), 7);
        assert_eq!(calendar[&monday()].appointments.len(), 1);
        assert_eq!(calendar[&monday()].weekday, "Lunes");
        let wednesday = monday() + Duration::days(2);
        assert_eq!(calendar[&wednesday].appointments.len(), 1);
        assert_eq!(calendar[&wednesday].weekday, "Miércoles");
        // Empty days are still present.
        let sunday = monday() + Duration::days(6);
        assert!(calendar[&sunday].appointments.is_empty());
        assert_eq!(calendar[&sunday].weekday, "Domingo");
    }

    #[tokio::test]
    async fn test_weekly_view_restricts_mechanics_to_own_agenda() {
        let db = test_db().await;
        let ana = mechanic(&db, "Ana").await;
        let luis = mechanic(&db, "Luis").await;
        let request_id = seed_request(&db).await;
        book(&db, request_id, ana.id, monday(), "08:00").await;
        book(&db, request_id, luis.id, monday(), "08:00").await;

        let own = weekly_view(&db, monday(), Role::Mechanic, Some(ana.id))
            .await
            .unwrap();
        assert_eq!(own[&monday()].appointments.len(), 1);
        assert_eq!(own[&monday()].appointments[0].mechanic_id, ana.id);

        let all = weekly_view(&db, monday(), Role::Admin, Some(ana.id))
            .await
            .unwrap();
        assert_eq!(all[&monday()].appointments.len(), 2);
    }

    #[tokio::test]
    async fn test_team_view_counts_only_live_appointments() {
        let db = test_db().await;
        let pedro = mechanic(&db, "Pedro").await;
        mechanic(&db, "Ana").await;
        let request_id = seed_request(&db).await;

        book(&db, request_id, pedro.id, monday(), "08:00").await;
        book(&db, request_id, pedro.id, monday(), "08:30").await;
        book(&db, request_id, pedro.id, monday(), "09:00").await;
        let cancelled = appointment::get_by_request(db.pool(), request_id)
            .await
            .unwrap()
            .unwrap();
        appointment::set_status(
            db.pool(),
            cancelled.id,
            database::AppointmentStatus::Cancelled,
        )
        .await
        .unwrap();

        let team = team_view(&db, monday()).await.unwrap();
        assert_eq!(team.len(), 2);

        let pedro_row = team.iter().find(|row| row.mechanic.id == pedro.id).unwrap();
        assert_eq!(pedro_row.appointments.len(), 3);
        assert_eq!(pedro_row.busy_hours, 1.0);
        assert_eq!(pedro_row.availability, Availability::Available);

        let ana_row = team.iter().find(|row| row.mechanic.id != pedro.id).unwrap();
        assert!(ana_row.appointments.is_empty());
        assert_eq!(ana_row.busy_hours, 0.0);
    }

    #[tokio::test]
    async fn test_team_view_partial_threshold() {
        let db = test_db().await;
        let pedro = mechanic(&db, "Pedro").await;
        let request_id = seed_request(&db).await;

        for time in ["08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30"] {
            book(&db, request_id, pedro.id, monday(), time).await;
        }

        let team = team_view(&db, monday()).await.unwrap();
        assert_eq!(team[0].availability, Availability::Partial);
        assert_eq!(team[0].busy_hours, 4.0);
    }
}
