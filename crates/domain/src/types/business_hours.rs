//! Business hours configuration

use chrono::Weekday;
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// Opening hours for a set of weekdays
///
/// `days_of_week` uses Sunday-based ordinals (`0` = Sunday ... `6` =
/// Saturday). The interval is `[start_hour, end_hour)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct BusinessHours {
    pub days_of_week: Vec<u32>,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl BusinessHours {
    pub fn new(days_of_week: impl Into<Vec<u32>>, start_hour: u32, end_hour: u32) -> Self {
        Self { days_of_week: days_of_week.into(), start_hour, end_hour }
    }

    /// Monday through Friday
    pub fn weekdays(start_hour: u32, end_hour: u32) -> Self {
        Self::new(vec![1, 2, 3, 4, 5], start_hour, end_hour)
    }

    pub fn covers(&self, weekday: Weekday) -> bool {
        self.days_of_week.contains(&weekday.num_days_from_sunday())
    }

    pub fn start_minute(&self) -> u32 {
        self.start_hour * 60
    }

    pub fn end_minute(&self) -> u32 {
        self.end_hour * 60
    }
}

/// A single business-hours entry or a list of per-weekday entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub enum BusinessHoursConfig {
    Single(BusinessHours),
    Multiple(Vec<BusinessHours>),
}

impl BusinessHoursConfig {
    pub fn entries(&self) -> &[BusinessHours] {
        match self {
            Self::Single(hours) => std::slice::from_ref(hours),
            Self::Multiple(list) => list,
        }
    }
}

impl From<BusinessHours> for BusinessHoursConfig {
    fn from(value: BusinessHours) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<BusinessHours>> for BusinessHoursConfig {
    fn from(value: Vec<BusinessHours>) -> Self {
        Self::Multiple(value)
    }
}

/// Visible hour window `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, rename_all = "camelCase"))]
pub struct HourRange {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourRange {
    pub const FULL_DAY: Self = Self { start_hour: 0, end_hour: 24 };

    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    pub fn len(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_single_and_list() {
        let single: BusinessHoursConfig =
            serde_json::from_str(r#"{"daysOfWeek":[1],"startHour":9,"endHour":17}"#).unwrap();
        assert_eq!(single.entries().len(), 1);

        let list: BusinessHoursConfig = serde_json::from_str(
            r#"[
                {"daysOfWeek":[1,2],"startHour":9,"endHour":17},
                {"daysOfWeek":[6],"startHour":10,"endHour":14}
            ]"#,
        )
        .unwrap();
        assert_eq!(list.entries().len(), 2);
    }

    #[test]
    fn covers_uses_sunday_based_ordinals() {
        let hours = BusinessHours::new(vec![0, 6], 10, 14);
        assert!(hours.covers(Weekday::Sun));
        assert!(hours.covers(Weekday::Sat));
        assert!(!hours.covers(Weekday::Mon));
    }
}
