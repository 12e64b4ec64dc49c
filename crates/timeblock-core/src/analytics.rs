//! Insights over an occurrence history: completion trend, per-category
//! performance, focus balance, a consistency score and a few rule-based
//! observations.
//!
//! Everything here is a pure function of its inputs. The caller captures
//! `reference_now` once and every window and bucket decision uses that value.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Category, Occurrence, TaskStatus};
use crate::timezone::{
    first_of_month, first_of_next_month, local_date, start_of_month, start_of_next_month, start_of_year,
};

const UNCATEGORIZED_NAME: &str = "Uncategorized";
const UNCATEGORIZED_COLOR: &str = "#94a3b8";
/// Number of trailing day buckets the pace observations look at.
const OBSERVATION_DAYS: usize = 7;
const MAX_OBSERVATIONS: usize = 2;
/// Completed occurrences a month needs before it is worth exporting.
const EXPORT_THRESHOLD: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Month,
    Year,
    AllTime,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Month => write!(f, "month"),
            ReportMode::Year => write!(f, "year"),
            ReportMode::AllTime => write!(f, "all"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid report mode: {0}")]
pub struct ParseReportModeError(String);

impl FromStr for ReportMode {
    type Err = ParseReportModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" => Ok(ReportMode::Month),
            "year" => Ok(ReportMode::Year),
            "all" | "alltime" | "all-time" => Ok(ReportMode::AllTime),
            _ => Err(ParseReportModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// How many categories the performance list keeps.
    pub top_categories: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self { top_categories: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    /// Compact display label, e.g. `Jan 12` or `Jan`.
    pub label: String,
    /// Sortable key, `2024-01-12` for days and `2024-01` for months.
    pub key: String,
    pub assigned: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPerformance {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    /// Planning volume in the mode's volume scope, future blocks included in Month mode.
    pub total_assigned: u32,
    /// Blocks that were due by `reference_now`; the completion-rate denominator.
    pub past_assigned: u32,
    pub completed: u32,
    /// 0..=100
    pub completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusSlice {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    /// Completed occurrences in the category.
    pub value: u32,
    pub percentage: u32,
    /// Summed actual duration of those occurrences.
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Overcommitted,
    SustainablePace,
    CategoryDominance { name: String, share: u32 },
    HighIntentLowCompletion { name: String },
    NotEnoughData,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Overcommitted => {
                write!(f, "Ambitious planning. You're assigning more than you typically complete.")
            }
            Observation::SustainablePace => {
                write!(f, "Sustainable pace. You're reliably clearing your daily board.")
            }
            Observation::CategoryDominance { name, share } => {
                write!(f, "{} is dominating your schedule ({}% of tasks).", name, share)
            }
            Observation::HighIntentLowCompletion { name } => {
                write!(f, "High intent on {}, but execution is lagging.", name)
            }
            Observation::NotEnoughData => write!(f, "Log more tasks to see behavioral patterns."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    pub mode: ReportMode,
    pub window_start: DateTime<Utc>,
    pub reference_now: DateTime<Utc>,
    pub trend: Vec<TrendBucket>,
    pub category_performance: Vec<CategoryPerformance>,
    pub focus_balance: Vec<FocusSlice>,
    pub consistency_score: u32,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// `2024-01`
    pub month: String,
    pub count: u32,
    pub eligible: bool,
}

/// `round(part / whole * 100)`, 0 for an empty whole.
fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Day,
    Month,
}

impl Granularity {
    fn for_mode(mode: ReportMode) -> Self {
        match mode {
            ReportMode::Month => Granularity::Day,
            ReportMode::Year | ReportMode::AllTime => Granularity::Month,
        }
    }

    fn bucket_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Month => first_of_month(date),
        }
    }

    fn next(self, bucket: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => bucket.succ_opt(),
            Granularity::Month => Some(first_of_next_month(bucket)),
        }
    }
}

pub struct AnalyticsAggregator {
    config: InsightsConfig,
    tz: Tz,
}

impl AnalyticsAggregator {
    pub fn new(config: InsightsConfig, tz: Tz) -> Self {
        Self { config, tz }
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// First instant counted by `mode`.
    ///
    /// AllTime starts at the month of the earliest planned block in `history`,
    /// or at the current month when there is no history at all.
    pub fn window_start(&self, mode: ReportMode, history: &[Occurrence], reference_now: DateTime<Utc>) -> DateTime<Utc> {
        match mode {
            ReportMode::Month => start_of_month(reference_now, self.tz),
            ReportMode::Year => start_of_year(reference_now, self.tz),
            ReportMode::AllTime => history
                .iter()
                .map(|o| o.planned_start)
                .min()
                .filter(|earliest| *earliest <= reference_now)
                .map(|earliest| start_of_month(earliest, self.tz))
                .unwrap_or_else(|| start_of_month(reference_now, self.tz)),
        }
    }

    pub fn compute(
        &self,
        history: &[Occurrence],
        categories: &[Category],
        mode: ReportMode,
        reference_now: DateTime<Utc>,
    ) -> InsightsReport {
        let window_start = self.window_start(mode, history, reference_now);
        let trend = self.trend(history, mode, window_start, reference_now);

        let month_trend = if mode == ReportMode::Month {
            trend.clone()
        } else {
            let month_start = self.window_start(ReportMode::Month, history, reference_now);
            self.trend(history, ReportMode::Month, month_start, reference_now)
        };

        let category_performance = self.category_performance(history, categories, mode, window_start, reference_now);
        let focus_balance = self.focus_balance(history, categories, window_start, reference_now);
        let consistency_score = consistency_score(&month_trend);
        let observations = observations(&month_trend, &category_performance);

        debug!(
            %mode,
            occurrences = history.len(),
            buckets = trend.len(),
            categories = category_performance.len(),
            consistency_score,
            "computed insights"
        );

        InsightsReport {
            mode,
            window_start,
            reference_now,
            trend,
            category_performance,
            focus_balance,
            consistency_score,
            observations,
        }
    }

    /// Assigned and completed counts per day (Month mode) or per month,
    /// zero-filled from `window_start` through `reference_now`.
    pub fn trend(
        &self,
        history: &[Occurrence],
        mode: ReportMode,
        window_start: DateTime<Utc>,
        reference_now: DateTime<Utc>,
    ) -> Vec<TrendBucket> {
        let granularity = Granularity::for_mode(mode);
        let first = granularity.bucket_of(local_date(window_start, self.tz));
        let last = granularity.bucket_of(local_date(reference_now, self.tz));

        let mut buckets: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
        let mut cursor = Some(first);
        while let Some(bucket) = cursor.filter(|b| *b <= last) {
            buckets.insert(bucket, (0, 0));
            cursor = granularity.next(bucket);
        }

        for occurrence in history {
            if occurrence.planned_start < window_start || occurrence.planned_start > reference_now {
                continue;
            }
            let bucket = granularity.bucket_of(local_date(occurrence.planned_start, self.tz));
            if let Some((assigned, completed)) = buckets.get_mut(&bucket) {
                *assigned += 1;
                if occurrence.status == TaskStatus::Completed {
                    *completed += 1;
                }
            }
        }

        buckets
            .into_iter()
            .map(|(bucket, (assigned, completed))| {
                let (key, label) = match (granularity, mode) {
                    (Granularity::Day, _) => (bucket.format("%Y-%m-%d"), bucket.format("%b %d")),
                    (Granularity::Month, ReportMode::Year) => (bucket.format("%Y-%m"), bucket.format("%b")),
                    (Granularity::Month, _) => (bucket.format("%Y-%m"), bucket.format("%b %y")),
                };
                TrendBucket {
                    label: label.to_string(),
                    key: key.to_string(),
                    assigned,
                    completed,
                }
            })
            .collect()
    }

    /// Per-category volume and completion rate, top `top_categories` by volume.
    pub fn category_performance(
        &self,
        history: &[Occurrence],
        categories: &[Category],
        mode: ReportMode,
        window_start: DateTime<Utc>,
        reference_now: DateTime<Utc>,
    ) -> Vec<CategoryPerformance> {
        let lookup = CategoryLookup::new(categories);
        // Month mode counts what is already scheduled for the rest of the month
        let month_end = start_of_next_month(reference_now, self.tz);
        let in_volume_scope = |instant: DateTime<Utc>| match mode {
            ReportMode::Month => instant >= window_start && instant < month_end,
            ReportMode::Year | ReportMode::AllTime => instant >= window_start && instant <= reference_now,
        };

        let mut rows: Vec<CategoryPerformance> = Vec::new();
        let mut index: HashMap<Uuid, usize> = HashMap::new();

        for occurrence in history.iter().filter(|o| in_volume_scope(o.planned_start)) {
            let position = *index.entry(occurrence.category_id).or_insert_with(|| {
                let (name, color) = lookup.name_and_color(occurrence.category_id);
                rows.push(CategoryPerformance {
                    category_id: occurrence.category_id,
                    name,
                    color,
                    total_assigned: 0,
                    past_assigned: 0,
                    completed: 0,
                    completion_rate: 0,
                });
                rows.len() - 1
            });

            let row = &mut rows[position];
            row.total_assigned += 1;
            if occurrence.planned_start <= reference_now {
                row.past_assigned += 1;
                if occurrence.status == TaskStatus::Completed {
                    row.completed += 1;
                }
            }
        }

        for row in &mut rows {
            row.completion_rate = percent(row.completed, row.past_assigned);
        }
        // stable: equal volumes keep first-seen order
        rows.sort_by(|a, b| b.total_assigned.cmp(&a.total_assigned));
        rows.truncate(self.config.top_categories);
        rows
    }

    /// How completed work in the window is spread across categories.
    pub fn focus_balance(
        &self,
        history: &[Occurrence],
        categories: &[Category],
        window_start: DateTime<Utc>,
        reference_now: DateTime<Utc>,
    ) -> Vec<FocusSlice> {
        let lookup = CategoryLookup::new(categories);
        let mut slices: Vec<FocusSlice> = Vec::new();
        let mut index: HashMap<Uuid, usize> = HashMap::new();

        let completed = history.iter().filter(|o| {
            o.status == TaskStatus::Completed && o.planned_start >= window_start && o.planned_start <= reference_now
        });

        for occurrence in completed {
            let position = *index.entry(occurrence.category_id).or_insert_with(|| {
                let (name, color) = lookup.name_and_color(occurrence.category_id);
                slices.push(FocusSlice {
                    category_id: occurrence.category_id,
                    name,
                    color,
                    value: 0,
                    percentage: 0,
                    minutes: 0,
                });
                slices.len() - 1
            });

            let slice = &mut slices[position];
            slice.value += 1;
            slice.minutes += occurrence
                .actual_duration()
                .unwrap_or_else(Duration::zero)
                .num_minutes();
        }

        let total: u32 = slices.iter().map(|s| s.value).sum();
        for slice in &mut slices {
            slice.percentage = percent(slice.value, total);
        }
        slices.sort_by(|a, b| b.value.cmp(&a.value));
        slices
    }
}

struct CategoryLookup<'a> {
    by_id: HashMap<Uuid, &'a Category>,
}

impl<'a> CategoryLookup<'a> {
    fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|c| (c.id, c)).collect(),
        }
    }

    fn name_and_color(&self, id: Uuid) -> (String, String) {
        match self.by_id.get(&id) {
            Some(category) => (category.name.clone(), category.color.clone()),
            None => (UNCATEGORIZED_NAME.to_string(), UNCATEGORIZED_COLOR.to_string()),
        }
    }
}

/// Completed over assigned across the whole trend, in percent.
pub fn consistency_score(trend: &[TrendBucket]) -> u32 {
    let (assigned, completed) = trend
        .iter()
        .fold((0, 0), |(a, c), bucket| (a + bucket.assigned, c + bucket.completed));
    percent(completed, assigned)
}

/// At most two short flags derived from the last week of the day trend and
/// the category list.
pub fn observations(day_trend: &[TrendBucket], performance: &[CategoryPerformance]) -> Vec<Observation> {
    let mut found = Vec::new();

    let recent = &day_trend[day_trend.len().saturating_sub(OBSERVATION_DAYS)..];
    let assigned: u32 = recent.iter().map(|b| b.assigned).sum();
    let completed: u32 = recent.iter().map(|b| b.completed).sum();
    let ratio = if assigned > 0 {
        f64::from(completed) / f64::from(assigned)
    } else {
        0.0
    };

    if assigned > 20 && ratio < 0.6 {
        found.push(Observation::Overcommitted);
    } else if ratio > 0.9 && assigned > 10 {
        found.push(Observation::SustainablePace);
    }

    if let Some(top) = performance.first() {
        let volume: u32 = performance.iter().map(|c| c.total_assigned).sum();
        if top.total_assigned * 2 > volume {
            found.push(Observation::CategoryDominance {
                name: top.name.clone(),
                share: percent(top.total_assigned, volume),
            });
        }

        if let Some(lagging) = performance
            .iter()
            .find(|c| c.total_assigned > 5 && c.completion_rate < 50)
        {
            found.push(Observation::HighIntentLowCompletion {
                name: lagging.name.clone(),
            });
        }
    }

    if found.is_empty() {
        found.push(Observation::NotEnoughData);
    }
    found.truncate(MAX_OBSERVATIONS);
    found
}

/// Completed occurrences per month over roughly the last year, newest month
/// first. A month is eligible for export once it has four completions.
pub fn monthly_completion_counts(history: &[Occurrence], reference_now: DateTime<Utc>, tz: Tz) -> Vec<MonthlyCount> {
    let floor = local_date(reference_now - Duration::days(365), tz);
    let floor = first_of_month(floor);

    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for occurrence in history.iter().filter(|o| o.status == TaskStatus::Completed) {
        let month = first_of_month(local_date(occurrence.planned_start, tz));
        if month >= floor {
            *counts.entry(month).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .rev()
        .map(|(month, count)| MonthlyCount {
            month: month.format("%Y-%m").to_string(),
            count,
            eligible: count >= EXPORT_THRESHOLD,
        })
        .collect()
}
