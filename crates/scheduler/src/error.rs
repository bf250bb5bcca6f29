//! Scheduling error types.

use chrono::NaiveDate;
use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while booking appointments.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No active mechanics to assign work to.
    #[error("no mechanics available")]
    NoMechanics,

    /// Every slot in the search horizon is taken.
    #[error("no slots available")]
    NoSlots,

    /// The requested slot is already booked.
    #[error("slot already booked: {date} {time}")]
    SlotTaken { date: NaiveDate, time: String },

    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}
