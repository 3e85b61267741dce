//! Series index
//!
//! Groups a flat event list by series uid once, so range queries and
//! mutations find a base and its overrides without rescanning the list per
//! series.

use std::collections::BTreeMap;

use calgrid_domain::Event;
use tracing::warn;

/// A recurring base and the overrides sharing its uid
#[derive(Debug, Default, Clone)]
pub struct SeriesEntry<'a> {
    pub base: Option<&'a Event>,
    pub overrides: Vec<&'a Event>,
}

/// Events of one list grouped by role
#[derive(Debug, Default, Clone)]
pub struct SeriesIndex<'a> {
    series: BTreeMap<String, SeriesEntry<'a>>,
    plain: Vec<&'a Event>,
}

impl<'a> SeriesIndex<'a> {
    pub fn build(events: &'a [Event], namespace: &str) -> Self {
        let mut index = Self::default();

        for event in events {
            if event.is_recurring_base() {
                let entry = index.series.entry(event.series_uid(namespace)).or_default();
                if entry.base.is_some() {
                    warn!(event_id = %event.id, "duplicate recurring base for series, ignoring");
                    continue;
                }
                entry.base = Some(event);
            } else if event.recurrence_id.is_some() {
                index.series.entry(event.series_uid(namespace)).or_default().overrides.push(event);
            } else {
                index.plain.push(event);
            }
        }

        index
    }

    pub fn get(&self, uid: &str) -> Option<&SeriesEntry<'a>> {
        self.series.get(uid)
    }

    pub fn series(&self) -> impl Iterator<Item = (&str, &SeriesEntry<'a>)> {
        self.series.iter().map(|(uid, entry)| (uid.as_str(), entry))
    }

    /// Events that are neither a recurring base nor an override
    pub fn plain(&self) -> &[&'a Event] {
        &self.plain
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
