//! Geometry for the two view families
//!
//! - [`day`]: vertical packing inside one time column
//! - [`grid`]: horizontal bars across day (or other unit) columns

pub mod day;
pub mod grid;

use calgrid_domain::{DayGrid, GridUnit, HourRange};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

pub use day::{cascade_offset, layout_day};
pub use grid::layout_grid;

use crate::time_range::local_day_start;

/// Hour-unit column for `date` in `tz`, restricted to `hours`.
pub fn day_grid_for(date: NaiveDate, tz: &Tz, hours: HourRange) -> DayGrid {
    let origin = local_day_start(date, tz) + Duration::hours(i64::from(hours.start_hour));
    DayGrid::new(origin, GridUnit::Hour, hours.len())
}
