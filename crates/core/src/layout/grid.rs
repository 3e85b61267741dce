//! Horizontal column layout for week, month and resource grids
//!
//! Multi-column bars are placed first so they get the top rows, then
//! single-column events fill what is left. Placement is first-fit over a
//! `day_max_events x columns` occupancy grid; bars that do not fit with
//! their full span retry from progressively later start columns. Whatever
//! still does not fit is counted in `hidden_per_column`.

use calgrid_domain::{Event, GridLayout, GridMetrics, GridRange, PositionedEvent};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

/// Column span of one event, relative to the visible grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    /// Column of the true start; negative when it starts before the grid
    true_start: i64,
    /// Column of the true last instant; may exceed the grid
    true_end: i64,
}

impl Span {
    /// Columns are taken from the start and the last covered instant
    /// (`end - 1ms`), so a midnight-to-midnight day stays in one column
    /// while a short event crossing midnight spans two.
    fn of(event: &Event, range: &GridRange) -> Self {
        let last_instant = if event.end > event.start {
            event.end - Duration::milliseconds(1)
        } else {
            event.start
        };
        Self {
            true_start: column_of(event.start, range),
            true_end: column_of(last_instant, range),
        }
    }

    fn is_visible(&self, columns: i64) -> bool {
        self.true_end >= 0 && self.true_start < columns
    }

    fn is_multi_column(&self) -> bool {
        self.true_start != self.true_end
    }

    /// Visible `(first, last)` columns, inclusive
    fn clamped(&self, columns: usize) -> (usize, usize) {
        let last_column = columns.saturating_sub(1);
        let first = usize::try_from(self.true_start.max(0)).unwrap_or(0).min(last_column);
        let last = usize::try_from(self.true_end.max(0)).unwrap_or(0).min(last_column);
        (first, last)
    }
}

fn column_of(instant: DateTime<Utc>, range: &GridRange) -> i64 {
    let unit = range.unit.seconds() * 1_000;
    (instant - range.start).num_milliseconds().div_euclid(unit)
}

/// Row-by-column occupancy
struct Occupancy {
    cells: Vec<Vec<bool>>,
}

impl Occupancy {
    fn new(rows: usize, columns: usize) -> Self {
        Self { cells: vec![vec![false; columns]; rows] }
    }

    /// First row whose cells `first..=last` are all free
    fn first_free_row(&self, first: usize, last: usize) -> Option<usize> {
        self.cells.iter().position(|row| row[first..=last].iter().all(|taken| !taken))
    }

    fn mark(&mut self, row: usize, first: usize, last: usize) {
        for cell in &mut self.cells[row][first..=last] {
            *cell = true;
        }
    }
}

/// Lay out `events` over the columns of `range`.
///
/// Events not intersecting the grid are ignored. `top`/`height` are pixels
/// derived from `metrics`; `left`/`width` are percentages of the grid width.
#[instrument(skip(events, metrics), fields(events = events.len()))]
pub fn layout_grid(events: &[Event], range: &GridRange, metrics: &GridMetrics) -> GridLayout {
    let columns = range.columns;
    let mut layout = GridLayout { events: Vec::new(), hidden_per_column: vec![0; columns] };
    let Ok(column_count) = i64::try_from(columns) else {
        return layout;
    };
    if columns == 0 {
        return layout;
    }

    let mut multi: Vec<(&Event, Span)> = Vec::new();
    let mut single: Vec<(&Event, Span)> = Vec::new();
    for event in events {
        let span = Span::of(event, range);
        if !span.is_visible(column_count) {
            continue;
        }
        if span.is_multi_column() {
            multi.push((event, span));
        } else {
            single.push((event, span));
        }
    }

    multi.sort_by(|(a, _), (b, _)| {
        a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)).then_with(|| a.id.cmp(&b.id))
    });
    single.sort_by(|(a, _), (b, _)| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let mut occupancy = Occupancy::new(metrics.day_max_events, columns);

    for (event, span) in multi {
        let (first, last) = span.clamped(columns);
        let placement = (first..=last).find_map(|start_column| {
            occupancy.first_free_row(start_column, last).map(|row| (row, start_column))
        });

        let Some((row, start_column)) = placement else {
            for hidden in &mut layout.hidden_per_column[first..=last] {
                *hidden += 1;
            }
            continue;
        };

        occupancy.mark(row, start_column, last);
        for hidden in &mut layout.hidden_per_column[first..start_column] {
            *hidden += 1;
        }
        layout.events.push(position(
            event,
            row,
            start_column,
            last,
            span.true_start < 0 || start_column > first,
            span.true_end >= column_count,
            columns,
            metrics,
        ));
    }

    for (event, span) in single {
        let (column, _) = span.clamped(columns);
        match occupancy.first_free_row(column, column) {
            Some(row) => {
                occupancy.mark(row, column, column);
                let placed = position(event, row, column, column, false, false, columns, metrics);
                layout.events.push(placed);
            }
            None => layout.hidden_per_column[column] += 1,
        }
    }

    debug!(
        placed = layout.events.len(),
        hidden = layout.hidden_per_column.iter().sum::<usize>(),
        "grid laid out"
    );
    layout
}

#[allow(clippy::too_many_arguments)]
fn position(
    event: &Event,
    row: usize,
    first: usize,
    last: usize,
    is_truncated_start: bool,
    is_truncated_end: bool,
    columns: usize,
    metrics: &GridMetrics,
) -> PositionedEvent {
    let columns = columns as f64;
    PositionedEvent {
        event: event.clone(),
        left: first as f64 / columns * 100.0,
        width: (last - first + 1) as f64 / columns * 100.0,
        top: metrics.row_top(row),
        height: metrics.bar_height,
        row,
        is_truncated_start,
        is_truncated_end,
        z_index: 1,
    }
}
