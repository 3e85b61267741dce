//! Vertical single-column layout
//!
//! Events are grouped into overlap clusters. A lone event spans the full
//! width; inside a larger cluster the longest event sits at the back and
//! shorter ones cascade rightward by a fixed offset table.

use calgrid_domain::constants::{
    CASCADE_OFFSET_FOUR, CASCADE_OFFSET_MANY, CASCADE_OFFSET_THREE, CASCADE_OFFSET_TWO,
};
use calgrid_domain::{DayGrid, Event, PositionedEvent};
use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::time_range::clamp_to_range;

/// Total horizontal cascade for a cluster of `size` events (percent).
pub fn cascade_offset(size: usize) -> f64 {
    match size {
        0 | 1 => 0.0,
        2 => CASCADE_OFFSET_TWO,
        3 => CASCADE_OFFSET_THREE,
        4 => CASCADE_OFFSET_FOUR,
        _ => CASCADE_OFFSET_MANY,
    }
}

struct Slot<'a> {
    event: &'a Event,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Slot<'_> {
    fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Position the timed events of one column.
///
/// All-day events are skipped, the rest are clamped to the grid and dropped
/// when nothing of them remains. `top`/`height` are percentages of the
/// column height.
pub fn layout_day(events: &[Event], grid: &DayGrid) -> Vec<PositionedEvent> {
    let grid_start = grid.origin;
    let grid_end = grid.end();
    let total_seconds = (grid_end - grid_start).num_seconds();
    if total_seconds <= 0 {
        return Vec::new();
    }

    let mut slots: Vec<Slot<'_>> = events
        .iter()
        .filter(|event| !event.all_day)
        .filter_map(|event| {
            clamp_to_range(event.start, event.end, grid_start, grid_end)
                .map(|(start, end)| Slot { event, start, end })
        })
        .collect();
    slots.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.end.cmp(&a.end))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });

    let mut positioned = Vec::with_capacity(slots.len());
    let mut cluster: Vec<Slot<'_>> = Vec::new();
    let mut cluster_end = grid_start;

    for slot in slots {
        if !cluster.is_empty() && slot.start >= cluster_end {
            place_cluster(&mut cluster, grid, total_seconds, &mut positioned);
        }
        cluster_end = if cluster.is_empty() { slot.end } else { cluster_end.max(slot.end) };
        cluster.push(slot);
    }
    place_cluster(&mut cluster, grid, total_seconds, &mut positioned);

    trace!(placed = positioned.len(), "day column laid out");
    positioned
}

fn place_cluster(
    cluster: &mut Vec<Slot<'_>>,
    grid: &DayGrid,
    total_seconds: i64,
    out: &mut Vec<PositionedEvent>,
) {
    let size = cluster.len();
    if size == 0 {
        return;
    }

    cluster.sort_by(|a, b| {
        b.duration()
            .cmp(&a.duration())
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });
    let step = if size > 1 { cascade_offset(size) / (size - 1) as f64 } else { 0.0 };
    let grid_end = grid.end();

    for (index, slot) in cluster.drain(..).enumerate() {
        let left = index as f64 * step;
        out.push(PositionedEvent {
            left,
            width: 100.0 - left,
            top: percent((slot.start - grid.origin).num_seconds(), total_seconds),
            height: percent(slot.duration().num_seconds(), total_seconds),
            row: index,
            is_truncated_start: slot.event.start < grid.origin,
            is_truncated_end: slot.event.end > grid_end,
            z_index: u32::try_from(index + 1).unwrap_or(u32::MAX),
            event: slot.event.clone(),
        });
    }
}

fn percent(part: i64, whole: i64) -> f64 {
    part as f64 / whole as f64 * 100.0
}
