//! VCALENDAR serialization

use std::collections::HashSet;

use calgrid_domain::constants::{
    ICAL_LINE_LIMIT, ICAL_PRODUCT_ID, ICAL_RULE_START_PROPERTY, ICAL_ZONE_PROPERTY,
};
use calgrid_domain::Event;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use super::escape_text;

const CRLF: &str = "\r\n";

/// Serialize `events` into a VCALENDAR document with CRLF line breaks.
///
/// `now` stamps DTSTAMP, CREATED and LAST-MODIFIED. Events without a uid are
/// written under their derived `${id}@${namespace}` uid. A zoned series gets
/// TZID-qualified local DTSTART/DTEND plus `X-CALGRID-TZID`, and an explicit
/// rule anchor is written as `X-CALGRID-RULE-START`.
#[instrument(skip(events), fields(events = events.len()))]
pub fn export_calendar(events: &[Event], now: DateTime<Utc>, namespace: &str) -> String {
    let base_uids: HashSet<String> = events
        .iter()
        .filter(|event| event.is_recurring_base())
        .map(|event| event.series_uid(namespace))
        .collect();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{ICAL_PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VTIMEZONE".to_string(),
        "TZID:UTC".to_string(),
        "BEGIN:STANDARD".to_string(),
        "DTSTART:19700101T000000".to_string(),
        "TZOFFSETFROM:+0000".to_string(),
        "TZOFFSETTO:+0000".to_string(),
        "TZNAME:UTC".to_string(),
        "END:STANDARD".to_string(),
        "END:VTIMEZONE".to_string(),
    ];

    let mut written = 0usize;
    for event in events {
        let uid = event.series_uid(namespace);
        let synthesized = event.recurrence_rule.is_none()
            && event.recurrence_id.is_none()
            && base_uids.contains(&uid);
        if synthesized {
            continue;
        }
        write_event(&mut lines, event, &uid, now);
        written += 1;
    }

    lines.push("END:VCALENDAR".to_string());
    debug!(written, "exported calendar");

    let mut document = String::new();
    for line in &lines {
        document.push_str(&fold_line(line));
        document.push_str(CRLF);
    }
    document
}

fn write_event(lines: &mut Vec<String>, event: &Event, uid: &str, now: DateTime<Utc>) {
    let stamp = format_instant(now);

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", escape_text(uid)));
    lines.push(format!("DTSTAMP:{stamp}"));

    if event.all_day {
        let (start, end) = all_day_dates(event);
        lines.push(format!("DTSTART;VALUE=DATE:{}", format_date(start)));
        lines.push(format!("DTEND;VALUE=DATE:{}", format_date(end)));
    } else {
        let zone = event.recurrence_rule.as_ref().and_then(|rule| rule.tzid.as_deref());
        lines.push(format!("DTSTART{}", date_time_value(event.start, zone)));
        lines.push(format!("DTEND{}", date_time_value(event.end, zone)));
    }

    lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
    if let Some(description) = &event.description {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = &event.location {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    if !event.resource_ids.is_empty() {
        let resources: Vec<String> =
            event.resource_ids.iter().map(|id| escape_text(id.as_str())).collect();
        lines.push(format!("RESOURCES:{}", resources.join(",")));
    }

    if let Some(rule) = &event.recurrence_rule {
        lines.push(format!("RRULE:{}", rule.to_rrule()));
        if let Some(zone) = &rule.tzid {
            lines.push(format!("{ICAL_ZONE_PROPERTY}:{}", escape_text(zone)));
        }
        if let Some(start) = rule.start {
            lines.push(format!("{ICAL_RULE_START_PROPERTY}:{}", format_instant(start)));
        }
    }
    if !event.exception_dates.is_empty() {
        let values: Vec<String> =
            event.exception_dates.iter().map(|date| format_value(*date, event.all_day)).collect();
        let prefix = if event.all_day { "EXDATE;VALUE=DATE" } else { "EXDATE" };
        lines.push(format!("{prefix}:{}", values.join(",")));
    }
    if let Some(recurrence_id) = event.recurrence_id {
        let prefix = if event.all_day { "RECURRENCE-ID;VALUE=DATE" } else { "RECURRENCE-ID" };
        lines.push(format!("{prefix}:{}", format_value(recurrence_id, event.all_day)));
    }

    lines.push(format!("CREATED:{stamp}"));
    lines.push(format!("LAST-MODIFIED:{stamp}"));
    lines.push("STATUS:CONFIRMED".to_string());
    lines.push("SEQUENCE:0".to_string());
    lines.push("TRANSP:OPAQUE".to_string());
    lines.push("END:VEVENT".to_string());
}

/// Start date and exclusive end date of an all-day event.
fn all_day_dates(event: &Event) -> (NaiveDate, NaiveDate) {
    let start = event.start.date_naive();
    let last_instant = if event.end > event.start {
        event.end - Duration::milliseconds(1)
    } else {
        event.start
    };
    let end = last_instant.date_naive().succ_opt().unwrap_or(start).max(start);
    (start, end)
}

/// Parameters and value of a DATE-TIME property: `;TZID=zone:local` when
/// the local time maps back to exactly `instant`, `:utc` otherwise.
fn date_time_value(instant: DateTime<Utc>, zone: Option<&str>) -> String {
    let local = zone.and_then(|name| name.parse::<Tz>().ok()).and_then(|tz| {
        let naive = instant.with_timezone(&tz).naive_local();
        // Ambiguous wall times would re-import as the earlier mapping
        tz.from_local_datetime(&naive).single().map(|_| (tz, naive))
    });
    match local {
        Some((tz, naive)) => format!(";TZID={}:{}", tz.name(), naive.format("%Y%m%dT%H%M%S")),
        None => format!(":{}", format_instant(instant)),
    }
}

fn format_value(instant: DateTime<Utc>, all_day: bool) -> String {
    if all_day {
        format_date(instant.date_naive())
    } else {
        format_instant(instant)
    }
}

pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Fold a content line at 75 octets without splitting UTF-8 sequences.
/// Continuation lines start with a single space.
pub(crate) fn fold_line(line: &str) -> String {
    if line.len() <= ICAL_LINE_LIMIT {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / ICAL_LINE_LIMIT * 3);
    let mut width = 0;
    let mut limit = ICAL_LINE_LIMIT;
    for ch in line.chars() {
        let size = ch.len_utf8();
        if width + size > limit {
            folded.push_str(CRLF);
            folded.push(' ');
            width = 0;
            // the leading space counts toward the next line
            limit = ICAL_LINE_LIMIT - 1;
        }
        folded.push(ch);
        width += size;
    }
    folded
}
