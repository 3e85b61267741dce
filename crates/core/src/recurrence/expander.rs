//! Occurrence expansion
//!
//! Precedence per generated slot: a stored override wins, then an exception
//! date suppresses the slot, otherwise an occurrence is synthesized from the
//! base. Synthesized ids are `${base_id}_${ordinal}` where the ordinal is the
//! slot's position in the whole series, so ids stay stable no matter which
//! window is being viewed.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use calgrid_domain::constants::SYNTHESIZED_ID_SEPARATOR;
use calgrid_domain::{Event, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use super::index::SeriesIndex;
use super::schedule::RecurrenceSchedule;
use super::RecurrenceOptions;

/// Expand `base` against the overrides found in `all_events`.
///
/// Non-recurring events expand to nothing.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` when the base rule is invalid.
pub fn expand(
    base: &Event,
    all_events: &[Event],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    let uid = base.series_uid(&options.namespace);
    let index = SeriesIndex::build(all_events, &options.namespace);
    let overrides = index.get(&uid).map(|entry| entry.overrides.as_slice()).unwrap_or_default();
    expand_series(base, overrides, range_start, range_end, options)
}

/// Expand `base` with an already collected override list.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` when the base rule is invalid.
#[instrument(skip(base, overrides, options), fields(base_id = %base.id))]
pub fn expand_series(
    base: &Event,
    overrides: &[&Event],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    let Some(rule) = &base.recurrence_rule else {
        return Ok(Vec::new());
    };
    let schedule = RecurrenceSchedule::build(rule, base.start, &options.timezone)?;
    let uid = base.series_uid(&options.namespace);
    let duration = base.duration();

    // First override per slot wins
    let mut by_slot: BTreeMap<DateTime<Utc>, &Event> = BTreeMap::new();
    for instance in overrides {
        if let Some(slot) = instance.recurrence_id {
            by_slot.entry(slot).or_insert(instance);
        }
    }
    let exceptions: HashSet<DateTime<Utc>> = base.exception_dates.iter().copied().collect();

    let mut occurrences = Vec::new();
    let mut consumed = BTreeSet::new();

    for (ordinal, slot) in schedule.between(range_start - duration, range_end) {
        if let Some(instance) = by_slot.get(&slot) {
            consumed.insert(slot);
            occurrences.push(materialize_override(base, instance, &uid));
        } else if !exceptions.contains(&slot) {
            occurrences.push(synthesize(base, ordinal, slot, duration, &uid));
        }
    }

    // Overrides moved into the range from a slot outside the scan window
    for (slot, instance) in &by_slot {
        if consumed.contains(slot) || !instance.overlaps(range_start, range_end) {
            continue;
        }
        if schedule.is_occurrence(*slot) {
            occurrences.push(materialize_override(base, instance, &uid));
        }
    }

    occurrences.retain(|event| event.overlaps(range_start, range_end));
    occurrences.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    debug!(occurrences = occurrences.len(), "expanded recurring series");
    Ok(occurrences)
}

fn synthesize(
    base: &Event,
    ordinal: u32,
    slot: DateTime<Utc>,
    duration: Duration,
    uid: &str,
) -> Event {
    Event {
        id: format!("{}{SYNTHESIZED_ID_SEPARATOR}{ordinal}", base.id),
        uid: Some(uid.to_string()),
        start: slot,
        end: slot + duration,
        recurrence_rule: None,
        exception_dates: Vec::new(),
        recurrence_id: None,
        ..base.clone()
    }
}

/// Override fields take precedence; optional fields it leaves empty fall
/// back to the base.
fn materialize_override(base: &Event, instance: &Event, uid: &str) -> Event {
    let mut merged = instance.clone();
    merged.uid = Some(uid.to_string());
    merged.recurrence_rule = None;
    merged.exception_dates.clear();
    if merged.description.is_none() {
        merged.description.clone_from(&base.description);
    }
    if merged.location.is_none() {
        merged.location.clone_from(&base.location);
    }
    if merged.resource_ids.is_empty() {
        merged.resource_ids.clone_from(&base.resource_ids);
    }
    merged
}

#[cfg(test)]
mod tests {
    use calgrid_domain::RecurrenceRule;
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn standup() -> Event {
        Event::new("standup", "Standup", at(4, 9), at(4, 9) + Duration::minutes(30))
            .with_rule(RecurrenceRule::daily())
    }

    fn override_at(id: &str, slot: DateTime<Utc>, start: DateTime<Utc>) -> Event {
        let mut event = Event::new(id, "Moved standup", start, start + Duration::hours(1))
            .with_uid("standup@calgrid");
        event.recurrence_id = Some(slot);
        event
    }

    #[test]
    fn synthesized_ids_use_series_ordinal() {
        let options = RecurrenceOptions::default();
        let found = expand(&standup(), &[], at(6, 0), at(7, 23), &options).unwrap();

        let ids: Vec<_> = found.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["standup_2", "standup_3"]);
        assert!(found.iter().all(|e| e.recurrence_rule.is_none()));
        assert!(found.iter().all(|e| e.uid.as_deref() == Some("standup@calgrid")));
    }

    #[test]
    fn exception_dates_suppress_slots() {
        let base = standup().with_exception(at(5, 9));
        let found = expand(&base, &[], at(4, 0), at(6, 23), &RecurrenceOptions::default()).unwrap();

        let starts: Vec<_> = found.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![at(4, 9), at(6, 9)]);
    }

    #[test]
    fn override_replaces_its_slot_even_when_excepted() {
        let base = standup().with_exception(at(5, 9));
        let all = vec![base.clone(), override_at("moved", at(5, 9), at(5, 14))];
        let options = RecurrenceOptions::default();
        let found = expand(&base, &all, at(5, 0), at(5, 23), &options).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "moved");
        assert_eq!(found[0].start, at(5, 14));
    }

    #[test]
    fn override_moved_into_range_is_emitted_once() {
        let base = standup();
        // Slot on the 4th, moved to the 8th
        let all = vec![base.clone(), override_at("moved", at(4, 9), at(8, 15))];
        let options = RecurrenceOptions::default();
        let found = expand(&base, &all, at(8, 0), at(8, 23), &options).unwrap();

        let ids: Vec<_> = found.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["standup_4", "moved"]);
    }

    #[test]
    fn override_moved_out_of_range_hides_its_slot() {
        let base = standup();
        let all = vec![base.clone(), override_at("moved", at(5, 9), at(9, 9))];
        let options = RecurrenceOptions::default();
        let found = expand(&base, &all, at(5, 0), at(5, 23), &options).unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn occurrences_starting_before_range_are_included_when_overlapping() {
        let base = Event::new("night", "Night shift", at(4, 22), at(5, 6))
            .with_rule(RecurrenceRule::daily());
        let found = expand(&base, &[], at(6, 0), at(6, 1), &RecurrenceOptions::default()).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, at(5, 22));
    }

    #[test]
    fn plain_events_expand_to_nothing() {
        let plain = Event::new("one", "One-off", at(4, 9), at(4, 10));
        assert!(expand(&plain, &[], at(1, 0), at(30, 0), &RecurrenceOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_rule_surfaces_error() {
        let base = standup().with_rule(RecurrenceRule::daily().times(0));
        assert!(expand(&base, &[], at(1, 0), at(30, 0), &RecurrenceOptions::default()).is_err());
    }
}
