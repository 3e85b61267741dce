//! Layout geometry types
//!
//! Positioned events are computed, never persisted, and are recomputed each
//! time the visible set or the grid capacity changes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::event::Event;
use crate::constants::{
    DEFAULT_BAR_GAP, DEFAULT_BAR_HEIGHT, DEFAULT_DAY_MAX_EVENTS, DEFAULT_DAY_NUMBER_HEIGHT,
};
use crate::impl_token_conversions;

/// Size of one grid unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "lowercase"))]
pub enum GridUnit {
    Minute,
    Hour,
    Day,
}

impl_token_conversions!(GridUnit {
    Minute => "minute",
    Hour => "hour",
    Day => "day",
});

impl GridUnit {
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }
}

/// Vertical single-column grid: `total_units` slots of `unit` from `origin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGrid {
    pub origin: DateTime<Utc>,
    pub unit: GridUnit,
    pub total_units: u32,
}

impl DayGrid {
    pub fn new(origin: DateTime<Utc>, unit: GridUnit, total_units: u32) -> Self {
        Self { origin, unit, total_units }
    }

    /// A 24-hour column starting at `origin`
    pub fn hours(origin: DateTime<Utc>) -> Self {
        Self::new(origin, GridUnit::Hour, 24)
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.origin + Duration::seconds(self.unit.seconds() * i64::from(self.total_units))
    }
}

/// Horizontal grid of `columns` consecutive `unit`-sized columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub start: DateTime<Utc>,
    pub columns: usize,
    pub unit: GridUnit,
}

impl GridRange {
    pub fn new(start: DateTime<Utc>, columns: usize, unit: GridUnit) -> Self {
        Self { start, columns, unit }
    }

    /// A seven-day week of day columns
    pub fn week(start: DateTime<Utc>) -> Self {
        Self::new(start, 7, GridUnit::Day)
    }

    pub fn column_start(&self, column: usize) -> DateTime<Utc> {
        let offset = i64::try_from(column).unwrap_or(i64::MAX / self.unit.seconds());
        self.start + Duration::seconds(self.unit.seconds() * offset)
    }

    /// Exclusive end of the visible window
    pub fn end(&self) -> DateTime<Utc> {
        self.column_start(self.columns)
    }
}

/// Capacity and pixel metrics of a horizontal grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct GridMetrics {
    pub day_max_events: usize,
    pub bar_height: f64,
    pub gap: f64,
    pub day_number_height: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            day_max_events: DEFAULT_DAY_MAX_EVENTS,
            bar_height: DEFAULT_BAR_HEIGHT,
            gap: DEFAULT_BAR_GAP,
            day_number_height: DEFAULT_DAY_NUMBER_HEIGHT,
        }
    }
}

impl GridMetrics {
    /// Pixel offset of a bar placed in `row`
    pub fn row_top(&self, row: usize) -> f64 {
        self.day_number_height + self.gap + row as f64 * (self.bar_height + self.gap)
    }
}

/// An event with its computed geometry
///
/// `left`/`width` are percentages of the grid width. For day columns
/// `top`/`height` are percentages of the column height; for horizontal grids
/// they are pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct PositionedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
    /// Cascade index within a day cluster, or the grid row
    pub row: usize,
    #[serde(default)]
    pub is_truncated_start: bool,
    #[serde(default)]
    pub is_truncated_end: bool,
    pub z_index: u32,
}

/// Result of a horizontal grid layout pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct GridLayout {
    pub events: Vec<PositionedEvent>,
    /// Events per column that did not fit within `day_max_events` rows
    pub hidden_per_column: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn grid_range_end_spans_all_columns() {
        let start = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap();
        let week = GridRange::week(start);

        assert_eq!(week.end(), Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(week.column_start(2), Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn row_top_stacks_bars_below_day_number() {
        let metrics =
            GridMetrics { day_max_events: 3, bar_height: 20.0, gap: 2.0, day_number_height: 24.0 };

        assert_eq!(metrics.row_top(0), 26.0);
        assert_eq!(metrics.row_top(2), 70.0);
    }
}
