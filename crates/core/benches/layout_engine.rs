use calgrid_core::{layout_day, layout_grid, query, RecurrenceOptions};
use calgrid_domain::{DayGrid, Event, GridMetrics, GridRange, GridUnit, RecurrenceRule};
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).single().unwrap()
}

/// A month of calendar data: recurring meetings plus scattered one-offs.
fn sample_events() -> Vec<Event> {
    let mut events: Vec<Event> = (0..20)
        .map(|idx| {
            let start = origin() + Duration::hours(8 + idx % 9) + Duration::minutes(15 * idx);
            let rule = if idx % 2 == 0 {
                RecurrenceRule::daily()
            } else {
                RecurrenceRule::weekly().on([Weekday::Mon, Weekday::Wed, Weekday::Fri])
            };
            Event::new(format!("series-{idx}"), "Series", start, start + Duration::minutes(45))
                .with_rule(rule)
        })
        .collect();

    events.extend((0..200).map(|idx| {
        let start = origin() + Duration::minutes(97 * idx);
        let length = Duration::minutes(30 + (idx % 5) * 30);
        Event::new(format!("one-off-{idx}"), "One-off", start, start + length)
    }));

    events.extend((0..10).map(|idx| {
        let start = origin() + Duration::days(idx * 2);
        Event::new(format!("trip-{idx}"), "Trip", start, start + Duration::days(3)).as_all_day()
    }));

    events
}

fn layout_benchmark(c: &mut Criterion) {
    let events = sample_events();
    let options = RecurrenceOptions::default();
    let week = GridRange::new(origin(), 7, GridUnit::Day);
    let metrics = GridMetrics::default();

    let mut group = c.benchmark_group("layout_engine");
    group.sample_size(50).measurement_time(std::time::Duration::from_secs(5));

    group.bench_function("query_week", |b| {
        b.iter(|| {
            let visible = query(black_box(&events), week.start, week.end(), &options).unwrap();
            black_box(visible);
        });
    });

    let visible = query(&events, week.start, week.end(), &options).unwrap();

    group.bench_function("layout_grid_week", |b| {
        b.iter(|| black_box(layout_grid(black_box(&visible), &week, &metrics)));
    });

    group.bench_function("layout_day_columns", |b| {
        b.iter(|| {
            for column in 0..week.columns {
                let grid = DayGrid::hours(week.column_start(column));
                black_box(layout_day(black_box(&visible), &grid));
            }
        });
    });

    group.finish();
}

criterion_group!(layout_benchmarks, layout_benchmark);
criterion_main!(layout_benchmarks);
