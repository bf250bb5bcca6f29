//! Mechanic workload balancing.

use chrono::{Duration, NaiveDate};

use database::{appointment, user, Database, User};

use crate::error::ScheduleError;

/// Days of lookahead used when weighing a mechanic's load.
const LOAD_WINDOW_DAYS: i64 = 7;

/// Pick the active mechanic with the fewest live appointments dated within
/// [today, today + 7].
///
/// Ties go to the first mechanic in listing order, so repeated calls with an
/// unchanged book give a stable assignment. Returns `None` when there are no
/// active mechanics at all.
pub async fn least_loaded_mechanic(
    db: &Database,
    today: NaiveDate,
) -> Result<Option<User>, ScheduleError> {
    let mechanics = user::list_active_mechanics(db.pool()).await?;
    let window_end = today + Duration::days(LOAD_WINDOW_DAYS);

    let mut best: Option<(User, i64)> = None;
    for mechanic in mechanics {
        let count =
            appointment::count_active_between(db.pool(), mechanic.id, today, window_end).await?;
        tracing::debug!("Mechanic {} has {} upcoming appointments", mechanic.name, count);

        match &best {
            Some((_, best_count)) if count >= *best_count => {}
            _ => best = Some((mechanic, count)),
        }
    }

    Ok(best.map(|(mechanic, _)| mechanic))
}
