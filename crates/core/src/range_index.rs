//! Range queries over a mixed event list
//!
//! Plain events are filtered by overlap, recurring bases are expanded, and
//! overrides are emitted through their series so a moved instance never
//! shows up twice.

use std::collections::HashSet;

use calgrid_domain::{Event, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::recurrence::{expand_series, RecurrenceOptions, SeriesIndex};

/// All concrete events overlapping `[range_start, range_end]` (inclusive).
///
/// The result is sorted by start, then longer events first, then id, and
/// holds at most one event per `(uid, start)` pair.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` when any recurring base carries an
/// invalid rule.
#[instrument(skip(events, options), fields(events = events.len()))]
pub fn query(
    events: &[Event],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    let index = SeriesIndex::build(events, &options.namespace);
    query_indexed(&index, range_start, range_end, options)
}

/// Same as [`query`] against a prebuilt [`SeriesIndex`].
///
/// # Errors
/// Returns `CalendarError::InvalidRule` when any recurring base carries an
/// invalid rule.
pub fn query_indexed(
    index: &SeriesIndex<'_>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    let mut found: Vec<Event> = index
        .plain()
        .iter()
        .filter(|event| event.overlaps(range_start, range_end))
        .map(|event| (*event).clone())
        .collect();

    for (_, entry) in index.series() {
        match entry.base {
            Some(base) => {
                let occurrences =
                    expand_series(base, &entry.overrides, range_start, range_end, options)?;
                found.extend(occurrences);
            }
            // Overrides whose base is gone behave like plain events
            None => found.extend(
                entry
                    .overrides
                    .iter()
                    .filter(|event| event.overlaps(range_start, range_end))
                    .map(|event| (*event).clone()),
            ),
        }
    }

    found.sort_by(|a, b| {
        a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)).then_with(|| a.id.cmp(&b.id))
    });

    let mut seen_slots = HashSet::new();
    let mut seen_ids = HashSet::new();
    found.retain(|event| {
        let slot = (event.series_uid(&options.namespace), event.start);
        seen_slots.insert(slot) && seen_ids.insert(event.id.clone())
    });

    debug!(visible = found.len(), "range query complete");
    Ok(found)
}

/// Events assigned to `resource_id`.
pub fn filter_by_resource(events: &[Event], resource_id: &str) -> Vec<Event> {
    events.iter().filter(|event| event.belongs_to_resource(resource_id)).cloned().collect()
}
