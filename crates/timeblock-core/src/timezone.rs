//! Time normalization: every instant entering the engine is mapped onto the
//! absolute (UTC) timeline here, and nowhere else.
//!
//! Calendar boundaries (day, month, year) depend on the user's wall clock, so
//! the helpers below take a [`Tz`], compute the boundary locally, and hand back
//! a UTC instant.

use crate::error::CoreError;
use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Converts user-supplied wall-clock text into an absolute instant.
///
/// Accepted forms:
/// - RFC 3339 with offset (`2024-01-01T10:00:00+02:00`, `2024-01-01T10:00:00Z`);
///   the embedded offset wins over `tz`
/// - naive date-time (`2024-01-01T10:00`, `2024-01-01 10:00:30`), read as local time in `tz`
/// - bare date (`2024-01-01`), read as local midnight in `tz`
///
/// Local times that fall in a DST gap, or that are ambiguous because of a DST
/// fold, are rejected rather than guessed.
pub fn normalize(input: &str, tz: Tz) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidTimestamp("empty timestamp".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(|| CoreError::InvalidTimestamp(format!("cannot parse '{}'", trimmed)))?;

    localize_strict(naive, tz)
}

/// [`normalize`] with wall-clock input read as UTC.
pub fn normalize_utc(input: &str) -> Result<DateTime<Utc>, CoreError> {
    normalize(input, Tz::UTC)
}

/// Maps a local wall-clock time to UTC, failing on DST gaps and folds.
pub fn localize_strict(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, CoreError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(CoreError::InvalidTimestamp(format!(
            "{} is ambiguous in {}",
            naive, tz
        ))),
        LocalResult::None => Err(CoreError::InvalidTimestamp(format!(
            "{} does not exist in {}",
            naive, tz
        ))),
    }
}

/// Maps a local wall-clock time to UTC for calendar boundaries, where a
/// result is always needed: folds resolve to the earlier instant and gaps
/// move forward by an hour.
pub fn localize_lenient(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => naive
            .checked_add_signed(Duration::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

/// Calendar date of `instant` on the wall clock of `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// First instant of `date` in `tz`.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    localize_lenient(date.and_time(chrono::NaiveTime::MIN), tz)
}

/// Monday of the week containing `date`.
pub fn first_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// First day of the month following the month of `date`.
pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    // 31 days past the 1st always lands inside the following month
    first_of_month(first_of_month(date) + Duration::days(31))
}

pub fn first_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

pub fn start_of_month(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    local_midnight(first_of_month(local_date(instant, tz)), tz)
}

pub fn start_of_next_month(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    local_midnight(first_of_next_month(local_date(instant, tz)), tz)
}

pub fn start_of_year(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    local_midnight(first_of_year(local_date(instant, tz)), tz)
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(datetime: DateTime<Utc>, tz: Tz, format: &str) -> String {
    datetime.with_timezone(&tz).format(format).to_string()
}

/// Get timezone abbreviation (e.g., "EST", "EDT")
pub fn timezone_abbreviation(tz: Tz, at_time: DateTime<Utc>) -> String {
    at_time.with_timezone(&tz).format("%Z").to_string()
}
