//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BAR_GAP, DEFAULT_BAR_HEIGHT, DEFAULT_DAY_MAX_EVENTS, DEFAULT_DAY_NUMBER_HEIGHT,
    DEFAULT_TIMEZONE, DEFAULT_UID_NAMESPACE,
};
use crate::errors::{CalendarError, Result};
use crate::types::{BusinessHoursConfig, GridMetrics};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace used when deriving `${id}@${namespace}` series uids
    pub uid_namespace: String,
    /// Default IANA zone for rules without their own `tzid`
    pub timezone: String,
    pub layout: LayoutConfig,
    pub business_hours: Option<BusinessHoursConfig>,
    pub hide_non_business_hours: bool,
    /// 0 = Sunday ... 6 = Saturday; only affects column dates
    pub first_day_of_week: u32,
}

/// Horizontal grid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub day_max_events: usize,
    pub bar_height: f64,
    pub gap: f64,
    pub day_number_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uid_namespace: DEFAULT_UID_NAMESPACE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            layout: LayoutConfig::default(),
            business_hours: None,
            hide_non_business_hours: false,
            first_day_of_week: 0,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            day_max_events: DEFAULT_DAY_MAX_EVENTS,
            bar_height: DEFAULT_BAR_HEIGHT,
            gap: DEFAULT_BAR_GAP,
            day_number_height: DEFAULT_DAY_NUMBER_HEIGHT,
        }
    }
}

impl LayoutConfig {
    pub fn metrics(&self) -> GridMetrics {
        GridMetrics {
            day_max_events: self.day_max_events,
            bar_height: self.bar_height,
            gap: self.gap,
            day_number_height: self.day_number_height,
        }
    }
}

impl EngineConfig {
    /// Structural validation; the time zone name is checked by the core
    /// crate, which owns the zone database.
    ///
    /// # Errors
    /// Returns `CalendarError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.uid_namespace.trim().is_empty() {
            return Err(CalendarError::Config("uid_namespace must not be empty".to_string()));
        }
        if self.layout.day_max_events == 0 {
            return Err(CalendarError::Config("day_max_events must be at least 1".to_string()));
        }
        if self.layout.bar_height <= 0.0 || self.layout.gap < 0.0 {
            return Err(CalendarError::Config(format!(
                "invalid bar metrics: height {} gap {}",
                self.layout.bar_height, self.layout.gap
            )));
        }
        if self.first_day_of_week > 6 {
            return Err(CalendarError::Config(format!(
                "first_day_of_week must be 0-6, got {}",
                self.first_day_of_week
            )));
        }
        if let Some(config) = &self.business_hours {
            for entry in config.entries() {
                if entry.start_hour >= entry.end_hour || entry.end_hour > 24 {
                    return Err(CalendarError::Config(format!(
                        "invalid business hours {}-{}",
                        entry.start_hour, entry.end_hour
                    )));
                }
                if let Some(day) = entry.days_of_week.iter().find(|day| **day > 6) {
                    return Err(CalendarError::Config(format!("invalid weekday ordinal {day}")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BusinessHours;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut config = EngineConfig::default();
        config.layout.day_max_events = 0;

        assert!(matches!(config.validate(), Err(CalendarError::Config(_))));
    }

    #[test]
    fn rejects_inverted_business_hours() {
        let config = EngineConfig {
            business_hours: Some(BusinessHours::weekdays(17, 9).into()),
            ..EngineConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"timezone":"Europe/Berlin","layout":{"day_max_events":5}}"#)
                .unwrap();

        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.layout.day_max_events, 5);
        assert_eq!(config.uid_namespace, DEFAULT_UID_NAMESPACE);
    }
}
