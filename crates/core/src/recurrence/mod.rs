//! Recurring series expansion
//!
//! Turns a base recurring event plus its stored overrides into the concrete
//! occurrences visible in a date range.

pub mod expander;
pub mod index;
pub mod schedule;

use calgrid_domain::constants::DEFAULT_UID_NAMESPACE;
use calgrid_domain::{EngineConfig, Result};
use chrono_tz::Tz;

pub use expander::{expand, expand_series};
pub use index::{SeriesEntry, SeriesIndex};
pub use schedule::RecurrenceSchedule;

use crate::time_range::resolve_timezone;

/// Settings shared by expansion, querying and series mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceOptions {
    /// Namespace for derived `${id}@${namespace}` uids
    pub namespace: String,
    /// Zone used for rules that carry no `tzid`
    pub timezone: Tz,
}

impl Default for RecurrenceOptions {
    fn default() -> Self {
        Self { namespace: DEFAULT_UID_NAMESPACE.to_string(), timezone: Tz::UTC }
    }
}

impl RecurrenceOptions {
    pub fn new(namespace: impl Into<String>, timezone: Tz) -> Self {
        Self { namespace: namespace.into(), timezone }
    }

    /// # Errors
    /// Returns `CalendarError::Config` when the configured zone is unknown.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.uid_namespace.clone(), resolve_timezone(&config.timezone)?))
    }
}
