//! VCALENDAR parsing
//!
//! Reads the same subset the exporter writes, including the `X-CALGRID-*`
//! rule extensions, plus TZID-qualified local date-times and nested
//! components (VALARM and friends, which are skipped).

use calgrid_domain::constants::{ICAL_RULE_START_PROPERTY, ICAL_ZONE_PROPERTY};
use calgrid_domain::{CalendarError, Event, RecurrenceRule, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use super::export::format_instant;
use super::{split_text_list, unescape_text};
use crate::time_range::localize;

/// One unfolded `NAME;PARAM=VALUE:value` line
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn parse(line: &str) -> Result<Self> {
        let split = value_separator(line)
            .ok_or_else(|| CalendarError::Interchange(format!("missing ':' in line '{line}'")))?;
        let (head, value) = (&line[..split], &line[split + 1..]);

        let mut parts = head.split(';');
        let name = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(CalendarError::Interchange(format!("missing property name in '{line}'")));
        }
        let params = parts
            .filter_map(|param| param.split_once('='))
            .map(|(key, value)| {
                (key.trim().to_ascii_uppercase(), value.trim_matches('"').to_string())
            })
            .collect();

        Ok(Self { name, params, value: value.to_string() })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }
}

/// Byte index of the first ':' outside a quoted parameter value
fn value_separator(line: &str) -> Option<usize> {
    let mut quoted = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(index),
            _ => {}
        }
    }
    None
}

/// Join continuation lines (leading space or tab) onto their predecessor.
fn unfold(input: &str) -> Result<Vec<String>> {
    let mut lines: Vec<String> = Vec::new();
    for raw in input.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            let previous = lines.last_mut().ok_or_else(|| {
                CalendarError::Interchange("continuation line before any content".to_string())
            })?;
            previous.push_str(rest);
        } else if !raw.trim().is_empty() {
            lines.push(raw.to_string());
        }
    }
    Ok(lines)
}

/// Parse a VCALENDAR document into events.
///
/// Base and plain events get their uid (minus an `@namespace` suffix) as
/// id; overrides get `${id}-${recurrence_id}` so every imported event has a
/// distinct id.
///
/// # Errors
/// - `CalendarError::Interchange` for structural problems: no VCALENDAR,
///   unterminated VEVENT, missing UID/DTSTART, unreadable dates
/// - `CalendarError::InvalidRule` for an unparseable RRULE
#[instrument(skip(input), fields(bytes = input.len()))]
pub fn parse_calendar(input: &str, namespace: &str) -> Result<Vec<Event>> {
    let mut seen_calendar = false;
    let mut current: Option<Vec<ContentLine>> = None;
    let mut nested = 0usize;
    let mut events = Vec::new();

    for line in unfold(input)? {
        let content = ContentLine::parse(&line)?;
        let component = content.value.trim().to_ascii_uppercase();

        match (content.name.as_str(), component.as_str()) {
            ("BEGIN", "VCALENDAR") => seen_calendar = true,
            ("BEGIN", "VEVENT") => {
                if !seen_calendar {
                    return Err(CalendarError::Interchange(
                        "VEVENT outside of VCALENDAR".to_string(),
                    ));
                }
                if current.is_some() {
                    return Err(CalendarError::Interchange("nested VEVENT".to_string()));
                }
                current = Some(Vec::new());
            }
            ("END", "VEVENT") => {
                let properties = current.take().ok_or_else(|| {
                    CalendarError::Interchange("END:VEVENT without BEGIN".to_string())
                })?;
                events.push(build_event(&properties, namespace)?);
            }
            ("BEGIN", _) if current.is_some() => nested += 1,
            ("END", _) if current.is_some() => nested = nested.saturating_sub(1),
            _ => {
                if let Some(properties) = current.as_mut() {
                    if nested == 0 {
                        properties.push(content);
                    }
                }
            }
        }
    }

    if !seen_calendar {
        return Err(CalendarError::Interchange("missing BEGIN:VCALENDAR".to_string()));
    }
    if current.is_some() {
        return Err(CalendarError::Interchange("unterminated VEVENT".to_string()));
    }

    debug!(events = events.len(), "parsed calendar");
    Ok(events)
}

fn build_event(properties: &[ContentLine], namespace: &str) -> Result<Event> {
    let find = |name: &str| properties.iter().find(|line| line.name == name);
    let find_all = |name: &'static str| properties.iter().filter(move |line| line.name == name);

    let uid = find("UID")
        .map(|line| unescape_text(line.value.trim()))
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| CalendarError::Interchange("VEVENT without UID".to_string()))?;

    let dtstart = find("DTSTART")
        .ok_or_else(|| CalendarError::Interchange(format!("VEVENT {uid} without DTSTART")))?;
    let (start, all_day) = parse_date_value(dtstart.value.trim(), dtstart)?;
    let tzid = dtstart.param("TZID").map(str::to_string);

    let end = match find("DTEND") {
        Some(line) => parse_date_value(line.value.trim(), line)?.0,
        None if all_day => start + Duration::days(1),
        None => start,
    };

    let recurrence_rule = match find("RRULE") {
        Some(line) => {
            let mut rule = RecurrenceRule::parse_rrule(line.value.trim())?;
            if rule.tzid.is_none() {
                rule.tzid = find(ICAL_ZONE_PROPERTY)
                    .map(|zone| unescape_text(zone.value.trim()))
                    .filter(|zone| !zone.is_empty())
                    .or(tzid);
            }
            if let Some(anchor) = find(ICAL_RULE_START_PROPERTY) {
                rule.start = Some(parse_date_value(anchor.value.trim(), anchor)?.0);
            }
            Some(rule)
        }
        None => None,
    };

    let mut exception_dates = Vec::new();
    for line in find_all("EXDATE") {
        for value in line.value.split(',').map(str::trim).filter(|value| !value.is_empty()) {
            exception_dates.push(parse_date_value(value, line)?.0);
        }
    }

    let recurrence_id = match find("RECURRENCE-ID") {
        Some(line) => Some(parse_date_value(line.value.trim(), line)?.0),
        None => None,
    };

    let suffix = format!("@{namespace}");
    let base_id = uid.strip_suffix(suffix.as_str()).unwrap_or(&uid).to_string();
    let id = match recurrence_id {
        Some(rid) => format!("{base_id}-{}", format_instant(rid)),
        None => base_id,
    };

    Ok(Event {
        id,
        title: find("SUMMARY").map(|line| unescape_text(&line.value)).unwrap_or_default(),
        description: find("DESCRIPTION").map(|line| unescape_text(&line.value)),
        location: find("LOCATION").map(|line| unescape_text(&line.value)),
        start,
        end,
        all_day,
        recurrence_rule,
        exception_dates,
        recurrence_id,
        resource_ids: find_all("RESOURCES").flat_map(|line| split_text_list(&line.value)).collect(),
        uid: Some(uid),
    })
}

/// Parse a DATE or DATE-TIME value. Returns the instant and whether the
/// value was a plain date.
fn parse_date_value(value: &str, line: &ContentLine) -> Result<(DateTime<Utc>, bool)> {
    let invalid = || CalendarError::Interchange(format!("invalid {} value '{value}'", line.name));

    let is_date = line.param("VALUE").is_some_and(|kind| kind.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|byte| byte.is_ascii_digit()));
    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid())?;
        return Ok((date.and_time(NaiveTime::MIN).and_utc(), true));
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok((naive.and_utc(), false));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    match line.param("TZID") {
        Some(name) => {
            let tz = name.parse::<Tz>().map_err(|_| {
                CalendarError::Interchange(format!("unknown TZID '{name}' on {}", line.name))
            })?;
            Ok((localize(&tz, naive), false))
        }
        // Floating time; read as UTC
        None => Ok((naive.and_utc(), false)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn parses_folded_and_escaped_fields() {
        let input = wrap(
            "BEGIN:VEVENT\r\nUID:offsite@calgrid\r\nDTSTART:20240304T090000Z\r\n\
             DTEND:20240304T170000Z\r\nSUMMARY:Team\\, offsite\r\nDESCRIPTION:Bring la\r\n \
             ptops\\nand chargers\r\nEND:VEVENT\r\n",
        );
        let events = parse_calendar(&input, "calgrid").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "offsite");
        assert_eq!(events[0].title, "Team, offsite");
        assert_eq!(events[0].description.as_deref(), Some("Bring laptops\nand chargers"));
    }

    #[test]
    fn tzid_times_are_localized() {
        let input = wrap(
            "BEGIN:VEVENT\r\nUID:call\r\nDTSTART;TZID=Europe/Berlin:20240304T090000\r\n\
             DTEND;TZID=Europe/Berlin:20240304T100000\r\nRRULE:FREQ=WEEKLY\r\nEND:VEVENT\r\n",
        );
        let events = parse_calendar(&input, "calgrid").unwrap();

        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap());
        let rule = events[0].recurrence_rule.as_ref().unwrap();
        assert_eq!(rule.tzid.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn nested_components_are_skipped() {
        let input = wrap(
            "BEGIN:VEVENT\r\nUID:a\r\nDTSTART;VALUE=DATE:20240304\r\nSUMMARY:Holiday\r\n\
             BEGIN:VALARM\r\nACTION:DISPLAY\r\nSUMMARY:Reminder\r\nEND:VALARM\r\nEND:VEVENT\r\n",
        );
        let events = parse_calendar(&input, "calgrid").unwrap();

        assert_eq!(events[0].title, "Holiday");
        assert!(events[0].all_day);
        assert_eq!(events[0].end - events[0].start, Duration::days(1));
    }

    #[test]
    fn missing_uid_is_an_interchange_error() {
        let input = wrap("BEGIN:VEVENT\r\nDTSTART:20240304T090000Z\r\nEND:VEVENT\r\n");
        assert!(matches!(parse_calendar(&input, "calgrid"), Err(CalendarError::Interchange(_))));
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(parse_calendar("BEGIN:VEVENT\r\n", "calgrid").is_err());
        let unterminated = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\n";
        assert!(parse_calendar(unterminated, "calgrid").is_err());
        assert!(parse_calendar(" folded first\r\n", "calgrid").is_err());
    }

    #[test]
    fn override_ids_carry_the_recurrence_id() {
        let input = wrap(
            "BEGIN:VEVENT\r\nUID:standup@calgrid\r\nDTSTART:20240305T140000Z\r\n\
             DTEND:20240305T150000Z\r\nRECURRENCE-ID:20240305T090000Z\r\nEND:VEVENT\r\n",
        );
        let events = parse_calendar(&input, "calgrid").unwrap();

        assert_eq!(events[0].id, "standup-20240305T090000Z");
        assert_eq!(events[0].uid.as_deref(), Some("standup@calgrid"));
    }
}
