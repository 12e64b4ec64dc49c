//! Column assignment for overlapping blocks on a single display day.
//!
//! Occurrences are partitioned into overlap groups (maximal chains of
//! intervals that overlap when swept by start time). Every member of a group
//! gets the same column count, the size of the group. This is interval
//! partitioning, not minimal interval-graph colouring: a short block that only
//! touches the head of a long chain still gets its own full column.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::cmp::Ordering;
use tracing::debug;

use crate::models::Occurrence;
use crate::timezone::local_midnight;

/// The display day as a range on the absolute timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn utc(date: NaiveDate) -> Self {
        Self::in_timezone(date, Tz::UTC)
    }

    /// Local midnight to local midnight; 23 or 25 hours long on DST change days.
    pub fn in_timezone(date: NaiveDate, tz: Tz) -> Self {
        let start = local_midnight(date, tz);
        let end = date
            .succ_opt()
            .map(|next| local_midnight(next, tz))
            .unwrap_or(start + chrono::Duration::days(1));
        Self { date, start, end }
    }

    fn percent_of_day(&self, instant: DateTime<Utc>) -> f64 {
        let clamped = instant.clamp(self.start, self.end);
        let total = (self.end - self.start).num_seconds() as f64;
        if total <= 0.0 {
            return 0.0;
        }
        (clamped - self.start).num_seconds() as f64 / total * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSlot<'a> {
    pub occurrence: &'a Occurrence,
    pub column_index: usize,
    pub column_count: usize,
    /// Offset of the block's top edge from the start of the day, in percent.
    pub top_percent: f64,
    /// Block height as a share of the day, in percent. Parts outside the day are cut off.
    pub height_percent: f64,
}

impl LayoutSlot<'_> {
    /// Horizontal offset of the column, in percent of the available width.
    pub fn left_percent(&self) -> f64 {
        self.column_index as f64 * self.width_percent()
    }

    pub fn width_percent(&self) -> f64 {
        100.0 / self.column_count as f64
    }
}

fn by_start(a: &&Occurrence, b: &&Occurrence) -> Ordering {
    a.planned_start
        .cmp(&b.planned_start)
        .then_with(|| a.planned_end.cmp(&b.planned_end))
        .then_with(|| a.id.cmp(&b.id))
}

/// Partitions occurrences into overlap groups, in start order.
///
/// An occurrence joins the current group when it starts strictly before the
/// latest end seen in that group, so blocks that merely touch stay apart.
pub fn overlap_groups(occurrences: &[Occurrence]) -> Vec<Vec<&Occurrence>> {
    let mut sorted: Vec<&Occurrence> = occurrences.iter().collect();
    sorted.sort_by(by_start);

    let mut groups: Vec<Vec<&Occurrence>> = Vec::new();
    let mut current: Vec<&Occurrence> = Vec::new();
    let mut group_end: Option<DateTime<Utc>> = None;

    for occurrence in sorted {
        match group_end {
            Some(end) if occurrence.planned_start < end => {
                group_end = Some(end.max(occurrence.planned_end));
            }
            _ => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                group_end = Some(occurrence.planned_end);
            }
        }
        current.push(occurrence);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Assigns every occurrence a column within its overlap group and its
/// vertical position within `day`. Output is in start order, one slot per input.
pub fn layout<'a>(occurrences: &'a [Occurrence], day: &DayWindow) -> Vec<LayoutSlot<'a>> {
    let groups = overlap_groups(occurrences);
    debug!(date = %day.date, occurrences = occurrences.len(), groups = groups.len(), "computed day layout");

    groups
        .into_iter()
        .flat_map(|group| {
            let column_count = group.len();
            group.into_iter().enumerate().map(move |(column_index, occurrence)| {
                let top_percent = day.percent_of_day(occurrence.planned_start);
                LayoutSlot {
                    occurrence,
                    column_index,
                    column_count,
                    top_percent,
                    height_percent: day.percent_of_day(occurrence.planned_end) - top_percent,
                }
            })
        })
        .collect()
}
