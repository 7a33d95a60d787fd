//! Conversions between a provider's local wall-clock time and UTC instants.
//!
//! All conversions go through chrono-tz's civil-to-absolute lookup so daylight
//! saving transitions resolve deterministically; no manual offset arithmetic.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::AvailabilityError;

/// Validate an IANA timezone identifier against the timezone database.
pub fn validate_timezone(timezone: &str) -> Result<Tz, AvailabilityError> {
    timezone
        .parse()
        .map_err(|_| AvailabilityError::InvalidTimezone(timezone.to_string()))
}

/// Resolve a local wall-clock time on a calendar date to a UTC instant.
///
/// An ambiguous local time (clocks rolled back) resolves to the earlier
/// instant; a non-existent local time (clocks rolled forward) slides forward
/// to the first representable wall-clock minute.
pub fn local_to_utc(date: NaiveDate, local_time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(local_time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a DST gap. Gaps are bounded (an hour in practice), so a
            // minute-granularity forward scan terminates quickly.
            let mut probe = naive;
            let scan_end = naive + Duration::days(2);
            while probe < scan_end {
                probe += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            // Unreachable for any real timezone database entry.
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// Local wall-clock time of a UTC instant, formatted "HH:MM".
pub fn utc_to_local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// Local calendar date of a UTC instant. This, not the UTC date, defines a
/// provider's day boundary.
pub fn utc_to_local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// UTC instant at which a local calendar date begins.
pub fn start_of_local_day_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date, NaiveTime::MIN, tz)
}
