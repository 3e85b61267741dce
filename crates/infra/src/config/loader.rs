//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CALGRID_TIMEZONE` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated, including the time zone name.
//!
//! ## Environment Variables
//! - `CALGRID_TIMEZONE`: Default IANA zone (required)
//! - `CALGRID_UID_NAMESPACE`: Namespace for derived series uids
//! - `CALGRID_DAY_MAX_EVENTS`: Rows per grid column before overflow
//! - `CALGRID_BAR_HEIGHT`: Grid bar height in pixels
//! - `CALGRID_GAP`: Gap between grid bars in pixels
//! - `CALGRID_DAY_NUMBER_HEIGHT`: Height reserved for the day number
//! - `CALGRID_HIDE_NON_BUSINESS_HOURS`: Restrict time grids to business hours
//! - `CALGRID_FIRST_DAY_OF_WEEK`: 0 = Sunday ... 6 = Saturday
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./calgrid.json` or `./calgrid.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use calgrid_core::time_range::resolve_timezone;
use calgrid_domain::{CalendarError, EngineConfig, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `CalendarError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The configuration fails validation
pub fn load() -> Result<EngineConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `CALGRID_TIMEZONE` is required; every other value falls back to
/// its default.
///
/// # Errors
/// Returns `CalendarError::Config` if the required variable is missing or
/// any variable has an invalid value.
pub fn load_from_env() -> Result<EngineConfig> {
    let defaults = EngineConfig::default();
    let mut config = EngineConfig { timezone: env_var("CALGRID_TIMEZONE")?, ..defaults };

    if let Ok(namespace) = std::env::var("CALGRID_UID_NAMESPACE") {
        config.uid_namespace = namespace;
    }
    config.layout.day_max_events =
        env_parse("CALGRID_DAY_MAX_EVENTS", config.layout.day_max_events)?;
    config.layout.bar_height = env_parse("CALGRID_BAR_HEIGHT", config.layout.bar_height)?;
    config.layout.gap = env_parse("CALGRID_GAP", config.layout.gap)?;
    config.layout.day_number_height =
        env_parse("CALGRID_DAY_NUMBER_HEIGHT", config.layout.day_number_height)?;
    config.hide_non_business_hours =
        env_bool("CALGRID_HIDE_NON_BUSINESS_HOURS", config.hide_non_business_hours);
    config.first_day_of_week = env_parse("CALGRID_FIRST_DAY_OF_WEEK", config.first_day_of_week)?;

    finalize(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing fields take their defaults.
///
/// # Errors
/// Returns `CalendarError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CalendarError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CalendarError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CalendarError::Config(format!("Failed to read config file: {e}")))?;

    finalize(parse_config(&contents, &config_path)?)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<EngineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CalendarError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CalendarError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CalendarError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Structural validation plus the zone lookup the domain crate cannot do.
fn finalize(config: EngineConfig) -> Result<EngineConfig> {
    config.validate()?;
    resolve_timezone(&config.timezone)?;
    Ok(config)
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./calgrid.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("calgrid.json"),
        dir.join("calgrid.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CalendarError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional environment variable, keeping `default` when unset.
fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CalendarError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const ENV_KEYS: &[&str] = &[
        "CALGRID_TIMEZONE",
        "CALGRID_UID_NAMESPACE",
        "CALGRID_DAY_MAX_EVENTS",
        "CALGRID_BAR_HEIGHT",
        "CALGRID_GAP",
        "CALGRID_DAY_NUMBER_HEIGHT",
        "CALGRID_HIDE_NON_BUSINESS_HOURS",
        "CALGRID_FIRST_DAY_OF_WEEK",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_env_bool_parsing() {
        std::env::set_var("TEST_CALGRID_BOOL_YES", "YES");
        std::env::set_var("TEST_CALGRID_BOOL_OFF", "off");

        assert!(env_bool("TEST_CALGRID_BOOL_YES", false));
        assert!(!env_bool("TEST_CALGRID_BOOL_OFF", true));
        assert!(env_bool("TEST_CALGRID_BOOL_MISSING", true));

        std::env::remove_var("TEST_CALGRID_BOOL_YES");
        std::env::remove_var("TEST_CALGRID_BOOL_OFF");
    }

    #[test]
    #[serial]
    fn test_load_from_env_all_vars_set() {
        clear_env();
        std::env::set_var("CALGRID_TIMEZONE", "Europe/Berlin");
        std::env::set_var("CALGRID_UID_NAMESPACE", "acme");
        std::env::set_var("CALGRID_DAY_MAX_EVENTS", "4");
        std::env::set_var("CALGRID_BAR_HEIGHT", "18.5");
        std::env::set_var("CALGRID_GAP", "1");
        std::env::set_var("CALGRID_DAY_NUMBER_HEIGHT", "20");
        std::env::set_var("CALGRID_HIDE_NON_BUSINESS_HOURS", "true");
        std::env::set_var("CALGRID_FIRST_DAY_OF_WEEK", "1");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.uid_namespace, "acme");
        assert_eq!(config.layout.day_max_events, 4);
        assert_eq!(config.layout.bar_height, 18.5);
        assert_eq!(config.layout.gap, 1.0);
        assert_eq!(config.layout.day_number_height, 20.0);
        assert!(config.hide_non_business_hours);
        assert_eq!(config.first_day_of_week, 1);
    }

    #[test]
    #[serial]
    fn test_load_from_env_missing_timezone() {
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, CalendarError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_load_from_env_invalid_number() {
        clear_env();
        std::env::set_var("CALGRID_TIMEZONE", "UTC");
        std::env::set_var("CALGRID_DAY_MAX_EVENTS", "plenty");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(CalendarError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_load_from_env_unknown_timezone() {
        clear_env();
        std::env::set_var("CALGRID_TIMEZONE", "Mars/Olympus_Mons");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(CalendarError::Config(_))));
    }

    #[test]
    fn test_parse_config_json() {
        let json_content = r#"{
            "timezone": "America/New_York",
            "hide_non_business_hours": true,
            "business_hours": { "daysOfWeek": [1, 2, 3, 4, 5], "startHour": 9, "endHour": 17 }
        }"#;

        let config = parse_config(json_content, &PathBuf::from("test.json")).unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert!(config.business_hours.is_some());
        assert_eq!(config.layout.day_max_events, EngineConfig::default().layout.day_max_events);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_content = r#"
timezone = "Asia/Tokyo"
first_day_of_week = 1

[layout]
day_max_events = 5
"#;

        let config = parse_config(toml_content, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert_eq!(config.first_day_of_week, 1);
        assert_eq!(config.layout.day_max_events, 5);
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("timezone: UTC", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_finalize_rejects_invalid_layout() {
        let mut config = EngineConfig::default();
        config.layout.day_max_events = 0;

        assert!(matches!(finalize(config), Err(CalendarError::Config(_))));
    }
}
