//! # Calgrid Core
//!
//! Recurrence and layout engines - no I/O, no rendering.
//!
//! This crate contains:
//! - Recurrence expansion and range queries over stored events
//! - Series mutation with this / following / all scopes
//! - Day-column and horizontal-grid layout
//! - Business-hours resolution and time-range helpers
//! - iCalendar import and export
//!
//! ## Architecture Principles
//! - Only depends on `calgrid-domain`
//! - Every operation is a pure function of its inputs (plus an id source
//!   for mutations)
//! - Events are caller-owned; results are fresh collections

pub mod business_hours;
pub mod interchange;
pub mod layout;
pub mod mutation;
pub mod normalize;
pub mod range_index;
pub mod recurrence;
pub mod service;
pub mod time_range;

// Re-export the engine entry points
pub use business_hours::{is_open, resolve_for_date, visible_hour_range, visible_hours};
pub use interchange::{export_calendar, parse_calendar};
pub use layout::{cascade_offset, day_grid_for, layout_day, layout_grid};
pub use mutation::{
    delete_series, update_series, IdGenerator, SequentialIdGenerator, SeriesMutator,
    UuidGenerator,
};
pub use normalize::{normalize_event, normalize_events, parse_date_input};
pub use range_index::{filter_by_resource, query};
pub use recurrence::{expand, RecurrenceOptions, RecurrenceSchedule};
pub use service::CalendarService;
