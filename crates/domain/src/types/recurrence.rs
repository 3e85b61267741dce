//! Recurrence rule types
//!
//! A [`RecurrenceRule`] is the structured form of the RFC 5545 RRULE subset
//! the engines support: FREQ, INTERVAL, BYDAY (plain weekdays), COUNT and
//! UNTIL, plus an explicit anchor and an optional IANA time zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::errors::{CalendarError, Result};
use crate::impl_token_conversions;

const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "lowercase"))]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl_token_conversions!(Frequency {
    Daily => "DAILY",
    Weekly => "WEEKLY",
    Monthly => "MONTHLY",
    Yearly => "YEARLY",
});

fn default_interval() -> u32 {
    1
}

/// Structured recurrence rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "ts-gen", ts(type = "Array<string>"))]
    pub by_weekday: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Explicit anchor; the owning event's start is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// IANA zone whose wall clock drives weekday and time-of-day matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tzid: Option<String>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            count: None,
            until: None,
            start: None,
            tzid: None,
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.by_weekday = weekdays.into_iter().collect();
        self
    }

    pub fn times(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn anchored_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn in_timezone(mut self, tzid: impl Into<String>) -> Self {
        self.tzid = Some(tzid.into());
        self
    }

    /// Raw payload embedded in error messages.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Merge a patch into this rule.
    ///
    /// Setting `count` clears `until` and vice versa, since a rule may carry
    /// at most one terminator.
    pub fn merge(&mut self, patch: &RecurrenceRulePatch) {
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(interval) = patch.interval {
            self.interval = interval;
        }
        if let Some(by_weekday) = &patch.by_weekday {
            self.by_weekday.clone_from(by_weekday);
        }
        if let Some(count) = patch.count {
            self.count = Some(count);
            self.until = None;
        }
        if let Some(until) = patch.until {
            self.until = Some(until);
            self.count = None;
        }
        if let Some(tzid) = &patch.tzid {
            self.tzid = Some(tzid.clone());
        }
    }

    /// Render the RRULE value (without the `RRULE:` prefix).
    pub fn to_rrule(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency)];

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if !self.by_weekday.is_empty() {
            let days: Vec<&str> = self.by_weekday.iter().map(|day| weekday_token(*day)).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("UNTIL={}", until.format(UNTIL_FORMAT)));
        }

        parts.join(";")
    }

    /// Parse an RRULE value such as `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE`.
    ///
    /// A leading `RRULE:` is accepted. Unsupported parts (BYMONTHDAY,
    /// ordinal BYDAY, ...) are rejected rather than silently ignored.
    pub fn parse_rrule(input: &str) -> Result<Self> {
        let body = input.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);
        let invalid = |cause: String| CalendarError::invalid_rule(body, cause);

        let mut frequency = None;
        let mut rule = Self::daily();

        for part in body.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            let (key, value) =
                part.split_once('=').ok_or_else(|| invalid(format!("malformed part '{part}'")))?;

            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency =
                        Some(value.parse::<Frequency>().map_err(|e| invalid(e.to_string()))?);
                }
                "INTERVAL" => {
                    rule.interval =
                        value.parse().map_err(|_| invalid(format!("invalid INTERVAL '{value}'")))?;
                }
                "BYDAY" => {
                    rule.by_weekday = value
                        .split(',')
                        .map(|token| {
                            parse_weekday_token(token)
                                .ok_or_else(|| invalid(format!("unsupported BYDAY '{token}'")))
                        })
                        .collect::<Result<Vec<_>>>()?;
                }
                "COUNT" => {
                    let count =
                        value.parse().map_err(|_| invalid(format!("invalid COUNT '{value}'")))?;
                    rule.count = Some(count);
                }
                "UNTIL" => {
                    let until = parse_until(value)
                        .ok_or_else(|| invalid(format!("invalid UNTIL '{value}'")))?;
                    rule.until = Some(until);
                }
                "WKST" => {}
                other => return Err(invalid(format!("unsupported rule part '{other}'"))),
            }
        }

        rule.frequency = frequency.ok_or_else(|| invalid("missing FREQ".to_string()))?;
        Ok(rule)
    }
}

/// Partial recurrence rule merged by scoped updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct RecurrenceRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts-gen", ts(type = "Array<string> | null"))]
    pub by_weekday: Option<Vec<Weekday>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tzid: Option<String>,
}

/// Two-letter RFC 5545 weekday token
pub fn weekday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parse a two-letter weekday token; ordinal forms (`1MO`) are not accepted.
pub fn parse_weekday_token(token: &str) -> Option<Weekday> {
    match token.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S") {
        return Some(naive.and_utc());
    }
    // A date-only UNTIL includes the whole day.
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn renders_rrule_in_canonical_order() {
        let rule = RecurrenceRule::weekly()
            .every(2)
            .on([Weekday::Mon, Weekday::Wed])
            .until(Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap());

        assert_eq!(rule.to_rrule(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;UNTIL=20240630T235959Z");
    }

    #[test]
    fn parses_rrule_with_prefix_and_count() {
        let rule = RecurrenceRule::parse_rrule("RRULE:FREQ=DAILY;COUNT=10;WKST=MO").unwrap();

        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.count, Some(10));
        assert!(rule.until.is_none());
    }

    #[test]
    fn parses_date_only_until_as_end_of_day() {
        let rule = RecurrenceRule::parse_rrule("FREQ=WEEKLY;UNTIL=20240131").unwrap();
        assert_eq!(rule.until, Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn rejects_unsupported_parts() {
        let err = RecurrenceRule::parse_rrule("FREQ=MONTHLY;BYMONTHDAY=15").unwrap_err();
        assert!(matches!(err, CalendarError::InvalidRule { .. }));

        let err = RecurrenceRule::parse_rrule("FREQ=MONTHLY;BYDAY=1MO").unwrap_err();
        assert!(err.to_string().contains("1MO"));

        assert!(RecurrenceRule::parse_rrule("INTERVAL=2").is_err());
    }

    #[test]
    fn merge_keeps_a_single_terminator() {
        let mut rule = RecurrenceRule::daily().times(5);
        rule.merge(&RecurrenceRulePatch {
            until: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..RecurrenceRulePatch::default()
        });

        assert!(rule.count.is_none());
        assert!(rule.until.is_some());
    }
}
