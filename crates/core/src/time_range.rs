//! Date-range helpers
//!
//! Pure functions shared by the recurrence and layout engines: overlap
//! tests, clamping, local-day boundaries and view column dates.

use calgrid_domain::{CalendarError, HourRange, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolve an IANA zone name.
///
/// # Errors
/// Returns `CalendarError::Config` for names missing from the zone database.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CalendarError::Config(format!("Unknown time zone: {name}")))
}

/// Inclusive overlap: touching endpoints count as overlapping.
pub fn overlaps_inclusive(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> bool {
    start <= range_end && end >= range_start
}

/// Half-open overlap: `[start, end)` against `[range_start, range_end)`.
pub fn overlaps_exclusive(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> bool {
    start < range_end && end > range_start
}

/// Clamp `[start, end]` into `[range_start, range_end]`.
///
/// Returns `None` when nothing of positive length remains.
pub fn clamp_to_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let clamped_start = start.max(range_start);
    let clamped_end = end.min(range_end);
    (clamped_end > clamped_start).then_some((clamped_start, clamped_end))
}

/// Convert a local wall-clock time to an instant.
///
/// Ambiguous times (DST fall-back) take the earliest mapping; nonexistent
/// times (DST spring-forward gap) are shifted forward by one hour.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}

/// Instant of local midnight starting `date`.
pub fn local_day_start(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    localize(tz, date.and_time(NaiveTime::MIN))
}

/// Last second (23:59:59) of `date` in local time.
pub fn local_day_end(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    localize(tz, date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1))
}

/// Local calendar date of an instant.
pub fn local_date(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// First date of the week containing `date`.
///
/// `first_day_of_week` uses Sunday-based ordinals (0 = Sunday).
pub fn week_start(date: NaiveDate, first_day_of_week: u32) -> NaiveDate {
    let weekday = date.weekday().num_days_from_sunday();
    let back = (weekday + 7 - first_day_of_week % 7) % 7;
    date - Duration::days(i64::from(back))
}

/// The seven column dates of the week containing `anchor`.
pub fn week_columns(anchor: NaiveDate, first_day_of_week: u32) -> Vec<NaiveDate> {
    let first = week_start(anchor, first_day_of_week);
    first.iter_days().take(7).collect()
}

/// Whole weeks covering the month of `anchor`, as column dates.
pub fn month_columns(anchor: NaiveDate, first_day_of_week: u32) -> Vec<NaiveDate> {
    let Some(month_first) = anchor.with_day(1) else {
        return Vec::new();
    };
    let month_last = month_first
        .checked_add_months(chrono::Months::new(1))
        .map_or(month_first, |next| next - Duration::days(1));

    let first = week_start(month_first, first_day_of_week);
    let last = week_start(month_last, first_day_of_week) + Duration::days(6);
    first.iter_days().take_while(|date| *date <= last).collect()
}

/// Keep only the hours inside `range`; `None` means no restriction.
pub fn filter_hours(hours: impl IntoIterator<Item = u32>, range: Option<HourRange>) -> Vec<u32> {
    match range {
        Some(range) => hours.into_iter().filter(|hour| range.contains(*hour)).collect(),
        None => hours.into_iter().collect(),
    }
}
