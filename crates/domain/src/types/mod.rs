//! Domain types and models
//!
//! Events and their recurrence metadata are owned by the caller; positioned
//! events and grid descriptions are ephemeral, recomputed for every query.

pub mod business_hours;
pub mod event;
pub mod layout;
pub mod recurrence;

pub use business_hours::{BusinessHours, BusinessHoursConfig, HourRange};
pub use event::{derive_uid, DateInput, Event, EventUpdate, MutationScope, RawEvent};
pub use layout::{DayGrid, GridLayout, GridMetrics, GridRange, GridUnit, PositionedEvent};
pub use recurrence::{Frequency, RecurrenceRule, RecurrenceRulePatch};
