//! Reference-timezone conversions
//!
//! Every calendar computation (hour buckets, "today", rendered timestamps)
//! goes through these functions with an explicit [`Tz`]; the host timezone
//! is never consulted.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Calendar date of `at` in `tz`
pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Hour of day (0-23) of `at` in `tz`
pub fn local_hour(at: DateTime<Utc>, tz: Tz) -> u32 {
    at.with_timezone(&tz).hour()
}

/// Instant of local midnight starting `date` in `tz`
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid instant after it
        None => tz
            .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Local midnight of the day containing `at`
pub fn start_of_today(at: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_day(local_date(at, tz), tz)
}

/// RFC 3339 rendering with milliseconds and the zone offset, e.g.
/// `2025-03-01T19:04:05.120+07:00`
pub fn to_iso_string(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Millis, false)
}
