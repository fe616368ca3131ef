//! Local calendar-day helpers
//!
//! Quota resets, due windows, and heatmap buckets are all defined in the
//! user's local calendar. Every helper takes the reference instant as a
//! parameter so callers and tests stay deterministic.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// The local calendar date containing `at`.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Local midnight of the day containing `at`, as a UTC instant.
pub fn start_of_local_day(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(local_date(at), at)
}

/// The last representable instant of the local day before `at`.
pub fn end_of_previous_local_day(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_local_day(at) - Duration::milliseconds(1)
}

/// Local midnight of `day`, as a UTC instant.
///
/// A DST gap can make local midnight nonexistent; in that case the
/// earliest valid instant of the day is used, falling back to `at`.
pub fn start_of_day(day: NaiveDate, at: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => at,
    }
}

/// Inclusive [start, end] bounds covering the whole local day `day`.
pub fn local_day_bounds(day: NaiveDate, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(day, at);
    let next = start_of_day(day + Duration::days(1), at);
    (start, next - Duration::milliseconds(1))
}
