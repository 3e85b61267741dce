//! Engine constants
//!
//! Centralized location for domain-level constants shared by the engines.

// Series identity
pub const DEFAULT_UID_NAMESPACE: &str = "calgrid";
pub const SYNTHESIZED_ID_SEPARATOR: char = '_';

// Time zones
pub const DEFAULT_TIMEZONE: &str = "UTC";

// Grid layout defaults (pixels)
pub const DEFAULT_DAY_MAX_EVENTS: usize = 3;
pub const DEFAULT_BAR_HEIGHT: f64 = 20.0;
pub const DEFAULT_BAR_GAP: f64 = 2.0;
pub const DEFAULT_DAY_NUMBER_HEIGHT: f64 = 24.0;

// Day layout cascade offsets (percent), keyed by cluster size.
// Visual regression tests pin these breakpoints.
pub const CASCADE_OFFSET_TWO: f64 = 25.0;
pub const CASCADE_OFFSET_THREE: f64 = 50.0;
pub const CASCADE_OFFSET_FOUR: f64 = 60.0;
pub const CASCADE_OFFSET_MANY: f64 = 70.0;

// Recurrence scanning guard: maximum number of periods walked per expansion
pub const MAX_RECURRENCE_PERIODS: u32 = 100_000;

// Business hours
pub const HOURS_PER_DAY: u32 = 24;

// iCalendar interchange
pub const ICAL_PRODUCT_ID: &str = "-//Calgrid//Calendar Engine//EN";
pub const ICAL_LINE_LIMIT: usize = 75;
/// Extension property carrying a series' IANA zone verbatim.
pub const ICAL_ZONE_PROPERTY: &str = "X-CALGRID-TZID";
/// Extension property carrying an explicit rule anchor.
pub const ICAL_RULE_START_PROPERTY: &str = "X-CALGRID-RULE-START";
