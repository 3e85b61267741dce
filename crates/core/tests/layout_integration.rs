//! Integration tests for day-column and horizontal-grid layout
//!
//! Scenarios mirror what a calendar view renders: a busy day column, a week
//! strip with multi-day events and overflow, and a zoned business-hours day.

use calgrid_core::{layout_day, layout_grid, CalendarService};
use calgrid_domain::{
    BusinessHours, DayGrid, EngineConfig, Event, GridMetrics, GridRange, PositionedEvent,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

fn find<'a>(placed: &'a [PositionedEvent], id: &str) -> &'a PositionedEvent {
    placed.iter().find(|p| p.event.id == id).unwrap()
}

// ============================================================================
// Day column
// ============================================================================

/// Scenario: a morning with three overlapping meetings, lunch right after
/// them, an overnight deploy from the previous evening and a holiday banner.
#[test]
fn test_busy_day_column() {
    let events = vec![
        Event::new("design", "Design", at(4, 9, 0), at(4, 11, 0)),
        Event::new("sync", "Sync", at(4, 10, 0), at(4, 12, 0)),
        Event::new("call", "Call", at(4, 10, 30), at(4, 11, 0)),
        Event::new("lunch", "Lunch", at(4, 12, 0), at(4, 13, 0)),
        Event::new("deploy", "Deploy", at(3, 22, 0), at(4, 1, 0)),
        Event::new("holiday", "Holiday", at(4, 0, 0), at(5, 0, 0)).as_all_day(),
    ];

    let placed = layout_day(&events, &DayGrid::hours(at(4, 0, 0)));

    assert_eq!(placed.len(), 5);
    assert!(placed.iter().all(|p| p.event.id != "holiday"));

    let design = find(&placed, "design");
    let sync = find(&placed, "sync");
    let call = find(&placed, "call");
    assert_eq!((design.left, design.width), (0.0, 100.0));
    assert_eq!((sync.left, sync.width), (25.0, 75.0));
    assert_eq!((call.left, call.width), (50.0, 50.0));
    assert_eq!((design.z_index, sync.z_index, call.z_index), (1, 2, 3));
    assert_close(design.top, 37.5);

    let lunch = find(&placed, "lunch");
    assert_eq!((lunch.left, lunch.width, lunch.row), (0.0, 100.0, 0));

    let deploy = find(&placed, "deploy");
    assert_eq!(deploy.top, 0.0);
    assert!(deploy.is_truncated_start);
    assert!(!deploy.is_truncated_end);
}

/// Many overlapping events never cascade past the cap.
#[test]
fn test_large_cluster_caps_cascade() {
    let events: Vec<_> = (0..8)
        .map(|i| Event::new(format!("e{i}"), "Busy", at(4, 9, i * 5), at(4, 12, 0)))
        .collect();

    let placed = layout_day(&events, &DayGrid::hours(at(4, 0, 0)));

    let max_left = placed.iter().map(|p| p.left).fold(0.0, f64::max);
    assert_close(max_left, 70.0);
    assert!(placed.iter().all(|p| p.width >= 30.0 - 1e-9));
}

// ============================================================================
// Horizontal grid
// ============================================================================

/// Scenario: a week strip (Sunday start) holding a trip that began last
/// week, a three-day conference and two Tuesday appointments, with room for
/// two rows per day.
#[test]
fn test_week_strip_with_overflow() {
    let events = vec![
        Event::new("trip", "Trip", at(2, 0, 0), at(5, 0, 0)),
        Event::new("conf", "Conference", at(4, 0, 0), at(7, 0, 0)),
        Event::new("standup", "Standup", at(5, 9, 0), at(5, 10, 0)),
        Event::new("dentist", "Dentist", at(5, 10, 0), at(5, 11, 0)),
    ];
    let metrics = GridMetrics { day_max_events: 2, ..GridMetrics::default() };

    let layout = layout_grid(&events, &GridRange::week(at(3, 0, 0)), &metrics);

    assert_eq!(layout.hidden_per_column, vec![0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(layout.events.len(), 3);

    let trip = find(&layout.events, "trip");
    assert_eq!(trip.row, 0);
    assert_eq!(trip.left, 0.0);
    assert_close(trip.width, 200.0 / 7.0);
    assert!(trip.is_truncated_start);
    assert!(!trip.is_truncated_end);

    let conf = find(&layout.events, "conf");
    assert_eq!(conf.row, 1);
    assert_close(conf.left, 100.0 / 7.0);
    assert_close(conf.width, 300.0 / 7.0);
    assert_eq!(conf.top, metrics.row_top(1));
    assert_eq!(conf.height, metrics.bar_height);

    let standup = find(&layout.events, "standup");
    assert_eq!(standup.row, 0);
    assert!(layout.events.iter().all(|p| p.event.id != "dentist"));
}

// ============================================================================
// Service pipeline
// ============================================================================

/// Scenario: a Berlin calendar that hides hours outside 08:00-18:00. A
/// noon meeting lands 40% down the visible column.
#[test]
fn test_zoned_business_hours_day_view() {
    let config = EngineConfig {
        timezone: "Europe/Berlin".to_string(),
        business_hours: Some(BusinessHours::weekdays(8, 18).into()),
        hide_non_business_hours: true,
        ..EngineConfig::default()
    };
    let service = CalendarService::new(config).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let events = vec![
        Event::new("lunch", "Team lunch", at(4, 11, 0), at(4, 13, 0)),
        Event::new("early", "Early gym", at(4, 5, 0), at(4, 6, 0)),
    ];

    let placed = service.layout_day(&events, date).unwrap();

    assert_eq!(service.visible_hours(&[date]).start_hour, 8);
    assert_eq!(placed.len(), 1);
    assert_close(placed[0].top, 40.0);
    assert_close(placed[0].height, 20.0);
}
