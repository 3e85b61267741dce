//! Series mutation
//!
//! Every operation returns a fresh event list; the input slice is never
//! modified. After any mutation a range query yields at most one concrete
//! occurrence per `(uid, start)` pair: a slot is either synthesized from the
//! base, replaced by exactly one override, or suppressed by an exception.

use calgrid_domain::{derive_uid, CalendarError, Event, EventUpdate, MutationScope, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument};

use super::ports::{IdGenerator, UuidGenerator};
use crate::recurrence::{RecurrenceOptions, RecurrenceSchedule};
use crate::time_range::{local_date, local_day_end};

/// Scoped update and delete over a raw event list
pub struct SeriesMutator<G: IdGenerator = UuidGenerator> {
    options: RecurrenceOptions,
    ids: G,
}

impl SeriesMutator<UuidGenerator> {
    pub fn new(options: RecurrenceOptions) -> Self {
        Self { options, ids: UuidGenerator }
    }
}

impl<G: IdGenerator> SeriesMutator<G> {
    /// Use a custom id source for new overrides and split-off series
    pub fn with_ids(options: RecurrenceOptions, ids: G) -> Self {
        Self { options, ids }
    }

    pub fn options(&self) -> &RecurrenceOptions {
        &self.options
    }

    /// Apply `updates` to the series containing `target`.
    ///
    /// `target` is any concrete occurrence of the series: a synthesized
    /// occurrence, a stored override, or the base itself.
    ///
    /// # Errors
    /// - `CalendarError::BaseSeriesNotFound` when no base carries the
    ///   target's uid
    /// - `CalendarError::InvalidRule` when the base rule is invalid
    ///   ("following" only)
    /// - `CalendarError::InvalidInput` when the update would end before it
    ///   starts
    #[instrument(skip(self, events, target, updates), fields(target_id = %target.id))]
    pub fn update(
        &self,
        events: &[Event],
        target: &Event,
        updates: &EventUpdate,
        scope: MutationScope,
    ) -> Result<Vec<Event>> {
        let uid = target.series_uid(&self.options.namespace);
        let base_index = self.locate_base(events, &uid)?;

        let (start, end) = updates.resolve_timing(target.start, target.end);
        if end < start {
            return Err(CalendarError::InvalidInput(format!(
                "update would end ({end}) before it starts ({start})"
            )));
        }

        let next = match scope {
            MutationScope::This => self.update_this(events, base_index, &uid, target, updates),
            MutationScope::Following => {
                self.update_following(events, base_index, &uid, target, updates)?
            }
            MutationScope::All => self.update_all(events, base_index, &uid, target, updates),
        };

        info!(%scope, %uid, events = next.len(), "series updated");
        Ok(next)
    }

    /// Delete the occurrence `target` with the given breadth.
    ///
    /// # Errors
    /// - `CalendarError::BaseSeriesNotFound` when no base carries the
    ///   target's uid
    /// - `CalendarError::InvalidRule` when the base rule is invalid
    ///   ("following" only)
    #[instrument(skip(self, events, target), fields(target_id = %target.id))]
    pub fn delete(
        &self,
        events: &[Event],
        target: &Event,
        scope: MutationScope,
    ) -> Result<Vec<Event>> {
        let uid = target.series_uid(&self.options.namespace);
        let base_index = self.locate_base(events, &uid)?;

        let next = match scope {
            MutationScope::This => self.delete_this(events, base_index, &uid, target),
            MutationScope::Following => self.delete_following(events, base_index, &uid, target)?,
            MutationScope::All => self.delete_all(events, &uid),
        };

        info!(%scope, %uid, events = next.len(), "series occurrence deleted");
        Ok(next)
    }

    fn locate_base(&self, events: &[Event], uid: &str) -> Result<usize> {
        events
            .iter()
            .position(|event| {
                event.is_recurring_base() && event.series_uid(&self.options.namespace) == uid
            })
            .ok_or_else(|| CalendarError::BaseSeriesNotFound(uid.to_string()))
    }

    fn is_override_of(&self, event: &Event, uid: &str) -> bool {
        event.recurrence_id.is_some()
            && !event.is_recurring_base()
            && event.series_uid(&self.options.namespace) == uid
    }

    fn schedule_of(&self, base: &Event) -> Result<RecurrenceSchedule> {
        let rule = base
            .recurrence_rule
            .as_ref()
            .ok_or_else(|| CalendarError::BaseSeriesNotFound(base.id.clone()))?;
        RecurrenceSchedule::build(rule, base.start, &self.options.timezone)
    }

    /// Except the slot on the base and store (or replace) one override.
    fn update_this(
        &self,
        events: &[Event],
        base_index: usize,
        uid: &str,
        target: &Event,
        updates: &EventUpdate,
    ) -> Vec<Event> {
        let slot = target.occurrence_slot();
        let mut next = events.to_vec();

        let base = &mut next[base_index];
        if !base.exception_dates.contains(&slot) {
            base.exception_dates.push(slot);
        }

        let existing = next
            .iter()
            .position(|event| self.is_override_of(event, uid) && event.recurrence_id == Some(slot));

        let mut instance = match existing {
            Some(position) => next[position].clone(),
            None => Event { id: self.ids.next_id(), ..target.clone() },
        };
        instance.uid = Some(uid.to_string());
        instance.recurrence_rule = None;
        instance.exception_dates.clear();
        instance.recurrence_id = Some(slot);
        updates.apply_details(&mut instance);
        let (start, end) = updates.resolve_timing(instance.start, instance.end);
        instance.start = start;
        instance.end = end;

        debug!(override_id = %instance.id, %slot, "stored override");
        match existing {
            Some(position) => next[position] = instance,
            None => next.push(instance),
        }
        next
    }

    /// Truncate the series before the target and start a new one at it.
    fn update_following(
        &self,
        events: &[Event],
        base_index: usize,
        uid: &str,
        target: &Event,
        updates: &EventUpdate,
    ) -> Result<Vec<Event>> {
        let base = &events[base_index];
        let schedule = self.schedule_of(base)?;
        let slot = target.occurrence_slot();
        let preceding = schedule.count_before(slot);

        let (start, end) = updates.resolve_timing(target.start, target.end);
        let shift = start - slot;

        let successor_id = self.ids.next_id();
        let successor_uid = derive_uid(&successor_id, &self.options.namespace);

        let mut rule = schedule.rule().clone();
        rule.start = Some(start);
        if let Some(count) = rule.count {
            rule.count = Some(count.saturating_sub(preceding).max(1));
        }
        if let Some(patch) = &updates.recurrence_rule {
            rule.merge(patch);
        }

        let mut successor = Event {
            id: successor_id,
            uid: Some(successor_uid.clone()),
            start,
            end,
            recurrence_rule: Some(rule),
            exception_dates: base
                .exception_dates
                .iter()
                .filter(|date| **date > slot)
                .map(|date| *date + shift)
                .collect(),
            recurrence_id: None,
            ..base.clone()
        };
        updates.apply_details(&mut successor);

        // Later overrides follow the new series unless its rule changed, in
        // which case their slots may no longer exist.
        let rehome = updates.recurrence_rule.is_none();
        let mut next = Vec::with_capacity(events.len() + 1);

        for (position, event) in events.iter().enumerate() {
            if position == base_index {
                if preceding > 0 {
                    next.push(truncate_before(event, slot, &schedule.timezone()));
                }
                continue;
            }
            if self.is_override_of(event, uid) {
                if let Some(rid) = event.recurrence_id.filter(|rid| *rid >= slot) {
                    if rehome && rid > slot {
                        next.push(Event {
                            uid: Some(successor_uid.clone()),
                            recurrence_id: Some(rid + shift),
                            ..event.clone()
                        });
                    }
                    continue;
                }
            }
            next.push(event.clone());
        }

        debug!(
            successor_id = %successor.id,
            preceding,
            "split series at occurrence"
        );
        next.push(successor);
        Ok(next)
    }

    /// Apply the update to the base. Timing edits shift the whole series by
    /// the target's delta; overrides keep their content.
    ///
    /// This departs from a plain "merge the update into the base" in two
    /// ways. Start/end are applied as deltas relative to `target`, so editing
    /// one occurrence's time does not move the series anchor to that
    /// occurrence's date. Overrides are left as stored except for their
    /// `recurrence_id`, which moves with the start shift; without that they
    /// would point at slots the shifted series no longer generates and both
    /// the override and a fresh synthesized occurrence would show.
    fn update_all(
        &self,
        events: &[Event],
        base_index: usize,
        uid: &str,
        target: &Event,
        updates: &EventUpdate,
    ) -> Vec<Event> {
        let start_shift = updates.start.map(|start| start - target.start);
        let end_shift = updates.end.map(|end| end - target.end);
        let (start_shift, end_shift) = match (start_shift, end_shift) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start),
            (None, Some(end)) => (Duration::zero(), end),
            (None, None) => (Duration::zero(), Duration::zero()),
        };

        let mut next = events.to_vec();

        let base = &mut next[base_index];
        base.start += start_shift;
        base.end += end_shift;
        updates.apply_details(base);
        if let Some(rule) = base.recurrence_rule.as_mut() {
            if let Some(anchor) = rule.start.as_mut() {
                *anchor += start_shift;
            }
            if let Some(patch) = &updates.recurrence_rule {
                rule.merge(patch);
            }
        }

        if start_shift != Duration::zero() {
            for date in &mut base.exception_dates {
                *date += start_shift;
            }
            // Keep overrides linked to their shifted slots
            for (position, event) in next.iter_mut().enumerate() {
                if position != base_index && self.is_override_of(event, uid) {
                    event.recurrence_id = event.recurrence_id.map(|rid| rid + start_shift);
                }
            }
        }

        next
    }

    fn delete_this(
        &self,
        events: &[Event],
        base_index: usize,
        uid: &str,
        target: &Event,
    ) -> Vec<Event> {
        let slot = target.occurrence_slot();

        events
            .iter()
            .enumerate()
            .filter(|(_, event)| {
                !(self.is_override_of(event, uid) && event.recurrence_id == Some(slot))
            })
            .map(|(position, event)| {
                let mut event = event.clone();
                if position == base_index && !event.exception_dates.contains(&slot) {
                    event.exception_dates.push(slot);
                }
                event
            })
            .collect()
    }

    fn delete_following(
        &self,
        events: &[Event],
        base_index: usize,
        uid: &str,
        target: &Event,
    ) -> Result<Vec<Event>> {
        let base = &events[base_index];
        let schedule = self.schedule_of(base)?;
        let slot = target.occurrence_slot();

        if schedule.count_before(slot) == 0 {
            return Ok(self.delete_all(events, uid));
        }

        Ok(events
            .iter()
            .enumerate()
            .filter(|(_, event)| {
                !(self.is_override_of(event, uid)
                    && event.recurrence_id.is_some_and(|rid| rid >= slot))
            })
            .map(|(position, event)| {
                if position == base_index {
                    truncate_before(event, slot, &schedule.timezone())
                } else {
                    event.clone()
                }
            })
            .collect())
    }

    fn delete_all(&self, events: &[Event], uid: &str) -> Vec<Event> {
        events
            .iter()
            .filter(|event| event.series_uid(&self.options.namespace) != uid)
            .cloned()
            .collect()
    }
}

/// End the series at the close of the local day before `slot`.
///
/// A COUNT terminator is replaced by the UNTIL bound: every occurrence
/// before `slot` lies on an earlier local day, so the kept set is the same.
fn truncate_before(base: &Event, slot: DateTime<Utc>, tz: &Tz) -> Event {
    let cutoff = local_date(slot, tz)
        .pred_opt()
        .map_or(slot - Duration::seconds(1), |day| local_day_end(day, tz));

    let mut truncated = base.clone();
    if let Some(rule) = truncated.recurrence_rule.as_mut() {
        rule.until = Some(rule.until.map_or(cutoff, |until| until.min(cutoff)));
        rule.count = None;
    }
    truncated.exception_dates.retain(|date| *date < slot);
    truncated
}

/// Update with a fresh UUID-based mutator.
///
/// # Errors
/// See [`SeriesMutator::update`].
pub fn update_series(
    events: &[Event],
    target: &Event,
    updates: &EventUpdate,
    scope: MutationScope,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    SeriesMutator::new(options.clone()).update(events, target, updates, scope)
}

/// Delete with a fresh UUID-based mutator.
///
/// # Errors
/// See [`SeriesMutator::delete`].
pub fn delete_series(
    events: &[Event],
    target: &Event,
    scope: MutationScope,
    options: &RecurrenceOptions,
) -> Result<Vec<Event>> {
    SeriesMutator::new(options.clone()).delete(events, target, scope)
}
