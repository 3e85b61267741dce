//! Calendar event types
//!
//! [`Event`] is the normalized internal shape every engine works on.
//! [`RawEvent`] is the permissive shape accepted at the ingestion boundary,
//! converted once by `calgrid_core::normalize`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::recurrence::{RecurrenceRule, RecurrenceRulePatch};
use crate::impl_token_conversions;

/// Derive the series uid for an event that carries none.
pub fn derive_uid(id: &str, namespace: &str) -> String {
    format!("{id}@{namespace}")
}

/// A calendar event: plain, a recurring base, an override, or a synthesized
/// occurrence.
///
/// - Base recurring event: `recurrence_rule` set, `recurrence_id` unset
/// - Override instance: `recurrence_id` set, `recurrence_rule` unset
/// - Synthesized occurrence: neither set, `uid` copied from its base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exception_dates: Vec<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<String>,
}

impl Event {
    /// Create a plain, non-recurring event
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            uid: None,
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            all_day: false,
            recurrence_rule: None,
            exception_dates: Vec::new(),
            recurrence_id: None,
            resource_ids: Vec::new(),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }

    pub fn with_exception(mut self, instant: DateTime<Utc>) -> Self {
        self.exception_dates.push(instant);
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_ids.push(resource_id.into());
        self
    }

    pub fn as_all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// Series uid, falling back to `${id}@${namespace}` when `uid` is unset.
    pub fn series_uid(&self, namespace: &str) -> String {
        self.uid.clone().unwrap_or_else(|| derive_uid(&self.id, namespace))
    }

    /// Duration of the event, never negative.
    pub fn duration(&self) -> Duration {
        (self.end - self.start).max(Duration::zero())
    }

    pub fn is_recurring_base(&self) -> bool {
        self.recurrence_rule.is_some() && self.recurrence_id.is_none()
    }

    pub fn is_override(&self) -> bool {
        self.recurrence_id.is_some() && self.recurrence_rule.is_none()
    }

    /// The series slot this event occupies: its `recurrence_id` when it is an
    /// override, otherwise its own start.
    pub fn occurrence_slot(&self) -> DateTime<Utc> {
        self.recurrence_id.unwrap_or(self.start)
    }

    /// Inclusive overlap against `[range_start, range_end]`.
    pub fn overlaps(&self, range_start: DateTime<Utc>, range_end: DateTime<Utc>) -> bool {
        self.start <= range_end && self.end >= range_start
    }

    pub fn belongs_to_resource(&self, resource_id: &str) -> bool {
        self.resource_ids.iter().any(|id| id == resource_id)
    }
}

/// Breadth of a mutation across a recurring series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "lowercase"))]
pub enum MutationScope {
    /// Only the targeted occurrence
    This,
    /// The targeted occurrence and every later one
    Following,
    /// The entire series
    All,
}

impl_token_conversions!(MutationScope {
    This => "this",
    Following => "following",
    All => "all",
});

/// Partial update applied by scoped mutations.
///
/// Layout geometry lives on [`PositionedEvent`](super::PositionedEvent) and
/// can never leak into a stored event through this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct EventUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRulePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ids: Option<Vec<String>>,
}

impl EventUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_rule(mut self, patch: RecurrenceRulePatch) -> Self {
        self.recurrence_rule = Some(patch);
        self
    }

    /// Apply the descriptive (non-timing, non-rule) fields to `event`.
    pub fn apply_details(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(resource_ids) = &self.resource_ids {
            event.resource_ids.clone_from(resource_ids);
        }
    }

    /// Resolve new `(start, end)` for an event currently at `[start, end]`.
    ///
    /// When only `start` changes the original duration is preserved.
    pub fn resolve_timing(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        match (self.start, self.end) {
            (Some(new_start), Some(new_end)) => (new_start, new_end),
            (Some(new_start), None) => (new_start, new_start + (end - start)),
            (None, Some(new_end)) => (start, new_end),
            (None, None) => (start, end),
        }
    }
}

/// Loosely typed instant accepted at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub enum DateInput {
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD`
    Text(String),
}

impl From<DateTime<Utc>> for DateInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Millis(value.timestamp_millis())
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Caller-supplied event before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<DateInput>,
    #[serde(default)]
    pub end: Option<DateInput>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub exception_dates: Vec<DateInput>,
    #[serde(default)]
    pub recurrence_id: Option<DateInput>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    #[test]
    fn series_uid_falls_back_to_namespace() {
        let event = Event::new("evt-1", "Standup", at(9), at(10));
        assert_eq!(event.series_uid("calgrid"), "evt-1@calgrid");

        let explicit = event.with_uid("series-9");
        assert_eq!(explicit.series_uid("calgrid"), "series-9");
    }

    #[test]
    fn resolve_timing_preserves_duration_when_only_start_moves() {
        let update = EventUpdate::new().with_start(at(13));
        let (start, end) = update.resolve_timing(at(9), at(11));

        assert_eq!(start, at(13));
        assert_eq!(end, at(15));
    }

    #[test]
    fn apply_details_leaves_unset_fields() {
        let mut event = Event::new("evt-1", "Standup", at(9), at(10));
        event.location = Some("Room 1".to_string());

        EventUpdate::new().with_title("Retro").apply_details(&mut event);

        assert_eq!(event.title, "Retro");
        assert_eq!(event.location.as_deref(), Some("Room 1"));
    }

    #[test]
    fn raw_event_accepts_mixed_date_inputs() {
        let raw: RawEvent = serde_json::from_str(
            r#"{"id":"a","title":"x","start":1709542800000,"end":"2024-03-04T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(raw.start, Some(DateInput::Millis(1_709_542_800_000)));
        assert_eq!(raw.end, Some(DateInput::Text("2024-03-04T10:00:00Z".to_string())));
    }

    #[test]
    fn mutation_scope_parses_tokens() {
        assert_eq!("following".parse::<MutationScope>().unwrap(), MutationScope::Following);
        assert!("everything".parse::<MutationScope>().is_err());
    }
}
