//! Appointment scheduling for the workshop.
//!
//! Approving a request books a workshop appointment in two greedy steps:
//!
//! 1. [`balancer::least_loaded_mechanic`] picks the active mechanic with the
//!    fewest live appointments in the coming week.
//! 2. [`schedule::find_next_slot`] walks a priority-dependent horizon of
//!    business days over the fixed 30-minute slot grid and takes the first
//!    free slot.
//!
//! The algorithm never moves existing appointments and never splits slots.
//! Double-booking is impossible even under concurrent approvals: the insert
//! lands on a unique index over live (mechanic, date, time) bookings.
//!
//! [`calendar`] reshapes booked appointments into the weekly and per-team
//! views the dashboard renders.

pub mod balancer;
pub mod calendar;
mod error;
pub mod schedule;
pub mod slots;

pub use calendar::{
    mechanic_day, monday_of_week, team_view, weekly_view, Availability, DaySchedule, MechanicDay,
};
pub use error::ScheduleError;
pub use schedule::{create_manual, schedule_for_request, ManualBooking};
pub use slots::{horizon_days, is_business_day, SLOT_DURATION_MINUTES, SLOT_TIMES};
