//! Calendar service - binds an [`EngineConfig`] to the engines
//!
//! The engines themselves are free functions over explicit arguments; this
//! facade resolves the configuration once (time zone, namespace, grid
//! metrics, business hours) and runs the query-then-layout pipeline views
//! need.

use calgrid_domain::{
    EngineConfig, Event, EventUpdate, GridLayout, GridRange, GridUnit, HourRange, MutationScope,
    PositionedEvent, RawEvent, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::business_hours::visible_hour_range;
use crate::interchange::{export_calendar, parse_calendar};
use crate::layout::{day_grid_for, layout_day, layout_grid};
use crate::mutation::{IdGenerator, SeriesMutator, UuidGenerator};
use crate::normalize::normalize_events;
use crate::range_index::{filter_by_resource, query};
use crate::recurrence::{expand, RecurrenceOptions};
use crate::time_range::{local_day_start, month_columns, week_columns};

/// Configured entry point to every engine
pub struct CalendarService<G: IdGenerator = UuidGenerator> {
    config: EngineConfig,
    mutator: SeriesMutator<G>,
}

impl CalendarService<UuidGenerator> {
    /// Create a service from a configuration
    ///
    /// # Errors
    /// Returns `CalendarError::Config` when the configuration is invalid or
    /// names an unknown time zone.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_ids(config, UuidGenerator)
    }
}

impl<G: IdGenerator> CalendarService<G> {
    /// Create a service with a custom id source for mutations
    ///
    /// # Errors
    /// Returns `CalendarError::Config` when the configuration is invalid or
    /// names an unknown time zone.
    pub fn with_ids(config: EngineConfig, ids: G) -> Result<Self> {
        config.validate()?;
        let options = RecurrenceOptions::from_config(&config)?;
        Ok(Self { config, mutator: SeriesMutator::with_ids(options, ids) })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn options(&self) -> &RecurrenceOptions {
        self.mutator.options()
    }

    pub fn timezone(&self) -> Tz {
        self.options().timezone
    }

    pub fn normalize(&self, raws: &[RawEvent]) -> Vec<Event> {
        normalize_events(raws)
    }

    /// # Errors
    /// Returns `CalendarError::InvalidRule` for an invalid base rule.
    pub fn expand(
        &self,
        base: &Event,
        events: &[Event],
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        expand(base, events, range_start, range_end, self.options())
    }

    /// # Errors
    /// Returns `CalendarError::InvalidRule` for an invalid base rule.
    pub fn query(
        &self,
        events: &[Event],
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        query(events, range_start, range_end, self.options())
    }

    /// Visible events assigned to one resource
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` for an invalid base rule.
    pub fn query_resource(
        &self,
        events: &[Event],
        resource_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let visible = self.query(events, range_start, range_end)?;
        Ok(filter_by_resource(&visible, resource_id))
    }

    /// # Errors
    /// See [`SeriesMutator::update`].
    pub fn update(
        &self,
        events: &[Event],
        target: &Event,
        updates: &EventUpdate,
        scope: MutationScope,
    ) -> Result<Vec<Event>> {
        self.mutator.update(events, target, updates, scope)
    }

    /// # Errors
    /// See [`SeriesMutator::delete`].
    pub fn delete(
        &self,
        events: &[Event],
        target: &Event,
        scope: MutationScope,
    ) -> Result<Vec<Event>> {
        self.mutator.delete(events, target, scope)
    }

    /// Hour window for a time-grid view showing `dates`
    pub fn visible_hours(&self, dates: &[NaiveDate]) -> HourRange {
        visible_hour_range(
            dates,
            self.config.business_hours.as_ref(),
            self.config.hide_non_business_hours,
        )
    }

    pub fn week_columns(&self, anchor: NaiveDate) -> Vec<NaiveDate> {
        week_columns(anchor, self.config.first_day_of_week)
    }

    pub fn month_columns(&self, anchor: NaiveDate) -> Vec<NaiveDate> {
        month_columns(anchor, self.config.first_day_of_week)
    }

    /// Query and lay out one day column, restricted to visible hours.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` for an invalid base rule.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub fn layout_day(&self, events: &[Event], date: NaiveDate) -> Result<Vec<PositionedEvent>> {
        let hours = self.visible_hours(&[date]);
        let grid = day_grid_for(date, &self.timezone(), hours);
        let visible = self.query(events, grid.origin, grid.end())?;
        let placed = layout_day(&visible, &grid);
        debug!(visible = visible.len(), placed = placed.len(), "day view ready");
        Ok(placed)
    }

    /// Query and lay out consecutive day columns starting at `columns[0]`.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` for an invalid base rule.
    #[instrument(skip(self, events, columns), fields(events = events.len()))]
    pub fn layout_grid(&self, events: &[Event], columns: &[NaiveDate]) -> Result<GridLayout> {
        let Some(first) = columns.first() else {
            return Ok(GridLayout::default());
        };
        let range = GridRange::new(
            local_day_start(*first, &self.timezone()),
            columns.len(),
            GridUnit::Day,
        );
        let visible = self.query(events, range.start, range.end())?;
        Ok(layout_grid(&visible, &range, &self.config.layout.metrics()))
    }

    pub fn export(&self, events: &[Event], now: DateTime<Utc>) -> String {
        export_calendar(events, now, &self.options().namespace)
    }

    /// # Errors
    /// Returns `CalendarError::Interchange` or `CalendarError::InvalidRule`
    /// for malformed input.
    pub fn import(&self, input: &str) -> Result<Vec<Event>> {
        parse_calendar(input, &self.options().namespace)
    }
}
