//! The fixed workshop slot grid.

use chrono::{Datelike, NaiveDate, Weekday};
use workshop_core::Priority;

/// Appointment length. Every booking takes exactly one slot.
pub const SLOT_DURATION_MINUTES: i64 = 30;

/// Workshop slots: 08:00-11:30 and 14:00-17:30 at 30-minute steps.
/// Lunch (12:00-14:00) is excluded. Order matters — the slot search takes
/// the first free entry.
pub const SLOT_TIMES: [&str; 16] = [
    "08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30",
    "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30",
];

/// How many days ahead the slot search may scan for a given priority.
pub fn horizon_days(priority: Priority) -> u32 {
    match priority {
        Priority::Urgent => 1,
        Priority::High => 3,
        _ => 7,
    }
}

/// Whether the workshop is open on a given date (weekends are skipped).
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
