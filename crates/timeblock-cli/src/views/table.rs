use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use timeblock_core::analytics::{InsightsReport, MonthlyCount};
use timeblock_core::layout::LayoutSlot;
use timeblock_core::models::{Category, Occurrence, RecurrenceTemplate, TaskPriority, TaskStatus};
use timeblock_core::planner::DayAgenda;
use timeblock_core::recurrence::Frequency;
use timeblock_core::timezone::format_with_timezone;
use uuid::Uuid;

use crate::util::short_id;

/// Width of the day strip drawn for each block, one cell per hour.
const DAY_STRIP_WIDTH: usize = 24;

const WEEKDAYS: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

#[derive(Debug, Clone)]
pub struct ViewCategory {
    pub name: String,
    pub color: Color,
}

impl ViewCategory {
    pub fn lookup(categories: &[Category]) -> HashMap<Uuid, ViewCategory> {
        categories
            .iter()
            .map(|c| {
                (
                    c.id,
                    ViewCategory {
                        name: c.name.clone(),
                        color: hex_color(&c.color),
                    },
                )
            })
            .collect()
    }
}

/// `#rrggbb` to a terminal color; anything else renders uncolored.
fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::Reset;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb { r, g, b },
        _ => Color::Reset,
    }
}

/// Draws where a block sits in the day: `top`/`height` in percent mapped onto
/// a fixed-width strip.
fn day_strip(top_percent: f64, height_percent: f64) -> String {
    let width = DAY_STRIP_WIDTH as f64;
    let from = (((top_percent / 100.0) * width).floor() as usize).min(DAY_STRIP_WIDTH - 1);
    let to = (((top_percent + height_percent) / 100.0) * width).ceil() as usize;
    let to = to.clamp(from + 1, DAY_STRIP_WIDTH);
    (0..DAY_STRIP_WIDTH)
        .map(|i| if i >= from && i < to { '█' } else { '·' })
        .collect()
}

/// Title with a repeat marker, struck through once closed and red when missed.
fn title_cell(occurrence: &Occurrence, now: DateTime<Utc>) -> Cell {
    let mut title = String::new();
    if occurrence.parent_id.is_some() || occurrence.is_series_head() {
        title.push_str("↻ ");
    }
    title.push_str(&occurrence.title);
    let cell = Cell::new(title);
    match occurrence.status {
        TaskStatus::Completed | TaskStatus::Skipped => cell.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey),
        _ if occurrence.is_missed(now) => cell.fg(Color::Red),
        _ => match occurrence.priority {
            TaskPriority::High => cell.add_attribute(Attribute::Bold),
            TaskPriority::Medium | TaskPriority::Low => cell,
        },
    }
}

/// `+15m` when a block started late, `-5m` when early, empty when it never started.
fn format_drift(drift: Option<Duration>) -> String {
    match drift {
        None => String::new(),
        Some(d) if d.is_zero() => "on time".to_string(),
        Some(d) => {
            let sign = if d < Duration::zero() { '-' } else { '+' };
            let minutes = d.num_minutes().abs();
            if minutes >= 60 {
                format!("{}{}h{:02}m", sign, minutes / 60, minutes % 60)
            } else {
                format!("{}{}m", sign, minutes)
            }
        }
    }
}

fn status_cell(status: TaskStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        TaskStatus::Completed => cell.fg(Color::Green),
        TaskStatus::Active => cell.fg(Color::Cyan).add_attribute(Attribute::Bold),
        TaskStatus::Skipped => cell.fg(Color::DarkGrey),
        TaskStatus::Planned => cell,
    }
}

pub fn display_day(slots: &[LayoutSlot<'_>], categories: &HashMap<Uuid, ViewCategory>, tz: Tz, now: DateTime<Utc>) {
    if slots.is_empty() {
        println!("No blocks planned.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Time", "Title", "Category", "Status", "Lane", "Day", "When"]);

    for slot in slots {
        let occurrence = slot.occurrence;
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&occurrence.id)));
        row.add_cell(Cell::new(format!(
            "{}-{}",
            format_with_timezone(occurrence.planned_start, tz, "%H:%M"),
            format_with_timezone(occurrence.planned_end, tz, "%H:%M")
        )));

        row.add_cell(title_cell(occurrence, now));

        let (category_name, color) = categories
            .get(&occurrence.category_id)
            .map(|c| (c.name.as_str(), c.color))
            .unwrap_or(("Uncategorized", Color::DarkGrey));
        row.add_cell(Cell::new(category_name).fg(color));
        row.add_cell(status_cell(occurrence.status));
        row.add_cell(Cell::new(format!("{}/{}", slot.column_index + 1, slot.column_count)));
        row.add_cell(Cell::new(day_strip(slot.top_percent, slot.height_percent)).fg(color));
        row.add_cell(Cell::new(occurrence.planned_start.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

/// Range listing grouped by local day. Days without blocks are listed only
/// when `include_empty_days` is set.
pub fn display_agenda(
    days: &[DayAgenda],
    categories: &HashMap<Uuid, ViewCategory>,
    tz: Tz,
    now: DateTime<Utc>,
    include_empty_days: bool,
) {
    if days.iter().all(|day| day.occurrences.is_empty()) {
        println!("No blocks planned.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Day", "ID", "Time", "Title", "Category", "Status", "Drift"]);

    for day in days {
        let label = day.window.date.format("%a %d %b").to_string();
        if day.occurrences.is_empty() {
            if include_empty_days {
                table.add_row(vec![Cell::new(label).fg(Color::DarkGrey), Cell::new(""), Cell::new("-")]);
            }
            continue;
        }

        for (i, slot) in day.slots().iter().enumerate() {
            let occurrence = slot.occurrence;
            let mut row = Row::new();
            row.add_cell(if i == 0 { Cell::new(&label).add_attribute(Attribute::Bold) } else { Cell::new("") });
            row.add_cell(Cell::new(short_id(&occurrence.id)));
            row.add_cell(Cell::new(format!(
                "{}-{}",
                format_with_timezone(occurrence.planned_start, tz, "%H:%M"),
                format_with_timezone(occurrence.planned_end, tz, "%H:%M")
            )));
            row.add_cell(title_cell(occurrence, now));
            let (category_name, color) = categories
                .get(&occurrence.category_id)
                .map(|c| (c.name.as_str(), c.color))
                .unwrap_or(("Uncategorized", Color::DarkGrey));
            row.add_cell(Cell::new(category_name).fg(color));
            row.add_cell(status_cell(occurrence.status));
            row.add_cell(Cell::new(format_drift(occurrence.start_drift())));
            table.add_row(row);
        }
    }

    println!("{table}");
}

fn ratio_bar(part: u32, whole: u32, width: usize) -> String {
    if whole == 0 {
        return String::new();
    }
    let filled = ((f64::from(part) / f64::from(whole)) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

pub fn display_insights(report: &InsightsReport, tz: Tz) {
    println!(
        "Insights ({}) since {}",
        report.mode,
        format_with_timezone(report.window_start, tz, "%Y-%m-%d")
    );
    println!("Consistency score: {}/100\n", report.consistency_score);

    let peak = report.trend.iter().map(|b| b.assigned).max().unwrap_or(0);
    let mut trend = Table::new();
    trend.set_header(vec!["Period", "Assigned", "Completed", ""]);
    for bucket in &report.trend {
        trend.add_row(vec![
            Cell::new(&bucket.label),
            Cell::new(bucket.assigned),
            Cell::new(bucket.completed),
            Cell::new(ratio_bar(bucket.completed, peak, 20)).fg(Color::Green),
        ]);
    }
    println!("{trend}");

    if report.category_performance.is_empty() {
        println!("No category activity yet.");
    } else {
        let mut performance = Table::new();
        performance.set_header(vec!["Category", "Assigned", "Completed", "Rate"]);
        for category in &report.category_performance {
            performance.add_row(vec![
                Cell::new(&category.name).fg(hex_color(&category.color)),
                Cell::new(category.total_assigned),
                Cell::new(format!("{}/{}", category.completed, category.past_assigned)),
                Cell::new(format!("{}%", category.completion_rate)),
            ]);
        }
        println!("{performance}");
    }

    if !report.focus_balance.is_empty() {
        let mut focus = Table::new();
        focus.set_header(vec!["Focus", "Completed", "Share", "Time"]);
        for slice in &report.focus_balance {
            focus.add_row(vec![
                Cell::new(&slice.name).fg(hex_color(&slice.color)),
                Cell::new(slice.value),
                Cell::new(format!("{}%", slice.percentage)),
                Cell::new(format!("{}h {:02}m", slice.minutes / 60, slice.minutes % 60)),
            ]);
        }
        println!("{focus}");
    }

    for observation in &report.observations {
        println!("• {}", observation);
    }
}

pub fn display_monthly_counts(counts: &[MonthlyCount]) {
    if counts.is_empty() {
        println!("No completed blocks in the last year.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Completed", "Exportable"]);
    for month in counts {
        let exportable = if month.eligible {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![Cell::new(&month.month), Cell::new(month.count), exportable]);
    }
    println!("{table}");
}

pub fn display_categories(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Color", "Default"]);
    for category in categories {
        table.add_row(vec![
            Cell::new(short_id(&category.id)),
            Cell::new(&category.name).fg(hex_color(&category.color)),
            Cell::new(&category.color),
            Cell::new(if category.is_default { "✓" } else { "" }),
        ]);
    }
    println!("{table}");
}

pub fn display_templates(templates: &[RecurrenceTemplate]) {
    if templates.is_empty() {
        println!("No templates found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Repeats", "Until", "Created"]);
    for template in templates {
        let rule = &template.rule;
        let unit = match rule.frequency {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
        };
        let mut repeats = if rule.interval > 1 {
            format!("every {} {}s", rule.interval, unit)
        } else {
            format!("every {}", unit)
        };
        if rule.frequency == Frequency::Weekly && !rule.days_of_week.is_empty() {
            let days: Vec<&str> = rule
                .days_of_week
                .iter()
                .filter_map(|d| WEEKDAYS.get(usize::from(*d)).copied())
                .collect();
            repeats = format!("{} on {}", repeats, days.join(","));
        }

        table.add_row(vec![
            Cell::new(&template.name),
            Cell::new(repeats),
            Cell::new(rule.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(template.created_at.humanize()),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#6366f1", Color::Rgb { r: 0x63, g: 0x66, b: 0xf1 })]
    #[case("94a3b8", Color::Rgb { r: 0x94, g: 0xa3, b: 0xb8 })]
    #[case("#zzzzzz", Color::Reset)]
    #[case("#fff", Color::Reset)]
    fn test_hex_color(#[case] hex: &str, #[case] expected: Color) {
        assert_eq!(hex_color(hex), expected);
    }

    #[test]
    fn test_day_strip_maps_percentages() {
        // 06:00 to 12:00
        let strip = day_strip(25.0, 25.0);
        assert_eq!(strip.chars().count(), DAY_STRIP_WIDTH);
        let filled: Vec<usize> = strip
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == '█')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(filled, (6..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_day_strip_shows_short_blocks() {
        let strip = day_strip(50.0, 0.5);
        assert_eq!(strip.chars().filter(|c| *c == '█').count(), 1);
        let strip = day_strip(99.9, 0.1);
        assert_eq!(strip.chars().last(), Some('█'));
    }

    #[rstest]
    #[case(None, "")]
    #[case(Some(Duration::zero()), "on time")]
    #[case(Some(Duration::minutes(15)), "+15m")]
    #[case(Some(Duration::minutes(-5)), "-5m")]
    #[case(Some(Duration::minutes(95)), "+1h35m")]
    fn test_format_drift(#[case] drift: Option<Duration>, #[case] expected: &str) {
        assert_eq!(format_drift(drift), expected);
    }

    #[test]
    fn test_ratio_bar() {
        assert_eq!(ratio_bar(5, 10, 10).chars().count(), 5);
        assert_eq!(ratio_bar(3, 0, 10), "");
    }
}
