//! Ingestion boundary
//!
//! Converts caller-supplied [`RawEvent`]s into [`Event`]s once, before any
//! engine sees them. The boundary is permissive: an unreadable start or end
//! falls back to the current instant and is logged, never rejected.

use calgrid_domain::{DateInput, Event, RawEvent};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::warn;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y%m%dT%H%M%S",
];

/// Read one loosely typed instant. Naive date-times are taken as UTC and
/// plain dates as UTC midnight.
pub fn parse_date_input(input: &DateInput) -> Option<DateTime<Utc>> {
    match input {
        DateInput::Millis(millis) => DateTime::from_timestamp_millis(*millis),
        DateInput::Text(text) => parse_date_text(text.trim()),
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    if let Some(parsed) =
        NAIVE_FORMATS.iter().find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
    {
        return Some(parsed.and_utc());
    }
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Normalize with an explicit "now" used for unreadable dates.
pub fn normalize_event_at(raw: &RawEvent, now: DateTime<Utc>) -> Event {
    let start = match &raw.start {
        Some(input) => parse_date_input(input).unwrap_or_else(|| {
            warn!(event_id = %raw.id, ?input, "unreadable start, using current time");
            now
        }),
        None => {
            warn!(event_id = %raw.id, "missing start, using current time");
            now
        }
    };

    let default_end = if raw.all_day { start + Duration::days(1) } else { start };
    let mut end = match &raw.end {
        Some(input) => parse_date_input(input).unwrap_or_else(|| {
            warn!(event_id = %raw.id, ?input, "unreadable end, using current time");
            now
        }),
        None => default_end,
    };
    if end < start {
        warn!(event_id = %raw.id, %start, %end, "end before start, collapsing to start");
        end = start;
    }

    // Unreadable exception dates and recurrence ids are dropped, not defaulted
    let exception_dates = raw
        .exception_dates
        .iter()
        .filter_map(|input| {
            let parsed = parse_date_input(input);
            if parsed.is_none() {
                warn!(event_id = %raw.id, ?input, "dropping unreadable exception date");
            }
            parsed
        })
        .collect();
    let recurrence_id = raw.recurrence_id.as_ref().and_then(|input| {
        let parsed = parse_date_input(input);
        if parsed.is_none() {
            warn!(event_id = %raw.id, ?input, "dropping unreadable recurrence id");
        }
        parsed
    });

    let mut resource_ids: Vec<String> = Vec::new();
    for id in raw.resource_id.iter().chain(raw.resource_ids.iter()) {
        if !resource_ids.contains(id) {
            resource_ids.push(id.clone());
        }
    }

    Event {
        id: raw.id.clone(),
        uid: raw.uid.clone().filter(|uid| !uid.trim().is_empty()),
        title: raw.title.clone(),
        description: raw.description.clone(),
        location: raw.location.clone(),
        start,
        end,
        all_day: raw.all_day,
        recurrence_rule: raw.recurrence_rule.clone(),
        exception_dates,
        recurrence_id,
        resource_ids,
    }
}

pub fn normalize_event(raw: &RawEvent) -> Event {
    normalize_event_at(raw, Utc::now())
}

/// Normalize a batch against a single "now".
pub fn normalize_events(raws: &[RawEvent]) -> Vec<Event> {
    let now = Utc::now();
    raws.iter().map(|raw| normalize_event_at(raw, now)).collect()
}
