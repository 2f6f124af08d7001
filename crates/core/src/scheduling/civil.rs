//! Conversions between a doctor's civil calendar and absolute instants.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolves a civil date and time in `tz` to an instant.
///
/// Returns `None` for times skipped by a DST jump. A repeated time picks the
/// earlier of the two instants.
pub fn resolve(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Instants bounding the civil day `date` in `tz`, as `[start, next start)`.
///
/// A day whose midnight falls in a DST gap starts at its first valid
/// quarter hour. `None` when either bound is not representable.
pub fn day_bounds(tz: Tz, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((start_of_day(tz, date)?, start_of_day(tz, date.succ_opt()?)?))
}

fn start_of_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..=12)
        .filter_map(|quarter| NaiveTime::from_hms_opt(quarter / 4, (quarter % 4) * 15, 0))
        .find_map(|time| resolve(tz, date, time))
}

pub fn to_local(tz: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

