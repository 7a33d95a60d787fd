//! Candidate slot generation for a provider's working window on one date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::services::time;

/// Slot start instants for a local working window on `date`.
///
/// The window end is exclusive of new starts: the last slot may end exactly
/// at `local_end`, but no slot starts after `local_end - duration`. Returns
/// an empty vector when the window is shorter than one slot.
pub fn generate_slots(
    local_start: NaiveTime,
    local_end: NaiveTime,
    date: NaiveDate,
    duration_minutes: i32,
    tz: Tz,
) -> Vec<DateTime<Utc>> {
    let duration = Duration::minutes(duration_minutes as i64);
    let window_start = time::local_to_utc(date, local_start, tz);
    let window_end = time::local_to_utc(date, local_end, tz);
    let last_valid_start = window_end - duration;

    let mut slots = Vec::new();
    let mut cursor = window_start;
    while cursor <= last_valid_start {
        slots.push(cursor);
        cursor += duration;
    }
    slots
}
