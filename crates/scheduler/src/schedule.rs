//! Appointment booking: automatic (balancer + slot search) and manual.

use chrono::{Duration, NaiveDate};
use tracing::info;
use workshop_core::Priority;

use database::appointment::{self, NewAppointment};
use database::{Appointment, AppointmentOrigin, Database, DatabaseError, MaintenanceRequest};

use crate::balancer;
use crate::error::ScheduleError;
use crate::slots::{horizon_days, is_business_day, SLOT_DURATION_MINUTES, SLOT_TIMES};

/// Find the earliest free slot for a mechanic within the priority horizon.
///
/// Walks day by day from `today` (weekends skipped), and within each day the
/// fixed slot list in order. Greedy and non-reassigning: existing bookings
/// are never moved.
pub async fn find_next_slot(
    db: &Database,
    mechanic_id: i64,
    priority: Priority,
    today: NaiveDate,
) -> Result<(NaiveDate, String), ScheduleError> {
    let days = horizon_days(priority);

    for offset in 0..days {
        let date = today + Duration::days(i64::from(offset));
        if !is_business_day(date) {
            continue;
        }

        for time in SLOT_TIMES {
            if !appointment::exists_active_at(db.pool(), mechanic_id, date, time).await? {
                return Ok((date, time.to_string()));
            }
        }
    }

    Err(ScheduleError::NoSlots)
}

/// Book an appointment for an approved request.
///
/// Picks the least-loaded mechanic, finds their earliest free slot within
/// the request's priority horizon, and creates the appointment (30 minutes,
/// origin automatic, state scheduled).
pub async fn schedule_for_request(
    db: &Database,
    request: &MaintenanceRequest,
    today: NaiveDate,
) -> Result<Appointment, ScheduleError> {
    let mechanic = balancer::least_loaded_mechanic(db, today)
        .await?
        .ok_or(ScheduleError::NoMechanics)?;

    let (date, time) = find_next_slot(db, mechanic.id, request.priority, today).await?;

    let created = appointment::create_appointment(
        db.pool(),
        &NewAppointment {
            request_id: request.id,
            mechanic_id: mechanic.id,
            date,
            time: time.clone(),
            duration_minutes: SLOT_DURATION_MINUTES,
            origin: AppointmentOrigin::Automatic,
            notes: None,
        },
    )
    .await?;

    info!(
        "Booked appointment for request #{}: {} {} with {}",
        request.id, date, time, mechanic.name
    );

    Ok(created)
}

/// An explicit booking made by a supervisor.
#[derive(Debug, Clone)]
pub struct ManualBooking {
    pub request_id: i64,
    pub mechanic_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub notes: Option<String>,
}

/// Book an explicit (mechanic, date, time) slot, bypassing the balancer and
/// slot search. Rejects with [`ScheduleError::SlotTaken`] if the slot is
/// already held by a live appointment.
pub async fn create_manual(
    db: &Database,
    booking: &ManualBooking,
) -> Result<Appointment, ScheduleError> {
    if appointment::exists_active_at(db.pool(), booking.mechanic_id, booking.date, &booking.time)
        .await?
    {
        return Err(ScheduleError::SlotTaken {
            date: booking.date,
            time: booking.time.clone(),
        });
    }

    let created = appointment::create_appointment(
        db.pool(),
        &NewAppointment {
            request_id: booking.request_id,
            mechanic_id: booking.mechanic_id,
            date: booking.date,
            time: booking.time.clone(),
            duration_minutes: SLOT_DURATION_MINUTES,
            origin: AppointmentOrigin::Manual,
            notes: booking.notes.clone(),
        },
    )
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent booking of the same slot.
        DatabaseError::Conflict { .. } => ScheduleError::SlotTaken {
            date: booking.date,
            time: booking.time.clone(),
        },
        other => ScheduleError::Database(other),
    })?;

    info!(
        "Manual appointment for request #{}: {} {} (mechanic {})",
        booking.request_id, booking.date, booking.time, booking.mechanic_id
    );

    Ok(created)
}
