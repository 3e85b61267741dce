//! Business hours resolution
//!
//! Feeds the visible-hour computation of time-grid views. A list config is
//! exclusive per weekday: the first entry listing a date's weekday wins.

use calgrid_domain::constants::HOURS_PER_DAY;
use calgrid_domain::{BusinessHours, BusinessHoursConfig, HourRange};
use chrono::{Datelike, NaiveDate};

use crate::time_range::filter_hours;

/// Resolve the business-hours entry applying to `date`.
///
/// A single config is returned as-is; callers check weekday coverage
/// separately (see [`is_open`]).
pub fn resolve_for_date(date: NaiveDate, config: &BusinessHoursConfig) -> Option<&BusinessHours> {
    match config {
        BusinessHoursConfig::Single(hours) => Some(hours),
        BusinessHoursConfig::Multiple(list) => {
            list.iter().find(|entry| entry.covers(date.weekday()))
        }
    }
}

/// Whether `hour:minute` on `date` falls within business hours.
///
/// With no config at all everything is open. The end bound is exclusive.
pub fn is_open(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    config: Option<&BusinessHoursConfig>,
) -> bool {
    let Some(config) = config else {
        return true;
    };
    let Some(entry) = resolve_for_date(date, config) else {
        return false;
    };
    if !entry.covers(date.weekday()) {
        return false;
    }

    let minute_of_day = hour * 60 + minute;
    minute_of_day >= entry.start_minute() && minute_of_day < entry.end_minute()
}

/// Union of business hours across `dates`: earliest start, latest end.
///
/// Returns `None` ("no restriction") when no date matches any entry.
pub fn union_hour_range(dates: &[NaiveDate], config: &BusinessHoursConfig) -> Option<HourRange> {
    dates
        .iter()
        .filter_map(|date| {
            resolve_for_date(*date, config).filter(|entry| entry.covers(date.weekday()))
        })
        .fold(None, |acc: Option<HourRange>, entry| {
            Some(match acc {
                Some(range) => HourRange {
                    start_hour: range.start_hour.min(entry.start_hour),
                    end_hour: range.end_hour.max(entry.end_hour),
                },
                None => HourRange { start_hour: entry.start_hour, end_hour: entry.end_hour },
            })
        })
}

/// Hour window a time-grid view should display for `dates`.
pub fn visible_hour_range(
    dates: &[NaiveDate],
    config: Option<&BusinessHoursConfig>,
    hide_non_business_hours: bool,
) -> HourRange {
    if !hide_non_business_hours {
        return HourRange::FULL_DAY;
    }
    config.and_then(|config| union_hour_range(dates, config)).unwrap_or(HourRange::FULL_DAY)
}

/// Hour labels a time-grid view should render for `dates`.
pub fn visible_hours(
    dates: &[NaiveDate],
    config: Option<&BusinessHoursConfig>,
    hide_non_business_hours: bool,
) -> Vec<u32> {
    let range = hide_non_business_hours
        .then(|| config.and_then(|config| union_hour_range(dates, config)))
        .flatten();
    filter_hours(0..HOURS_PER_DAY, range)
}
