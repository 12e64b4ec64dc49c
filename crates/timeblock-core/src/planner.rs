//! The planner ties the pure engine (normalization, expansion, lifecycle,
//! layout, insights) to a store. Every clock reading is passed in by the
//! caller.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analytics::{monthly_completion_counts, AnalyticsAggregator, InsightsConfig, InsightsReport, MonthlyCount, ReportMode};
use crate::error::CoreError;
use crate::layout::{layout, DayWindow, LayoutSlot};
use crate::lifecycle::{set_reflection, transition};
use crate::models::{
    Category, NewOccurrenceData, Occurrence, OccurrenceEdit, PlannedTime, RecurrenceTemplate, Reflection, TaskStatus,
    TimeRange, UpdateOccurrenceData,
};
use crate::recurrence::{MaterializationConfig, RecurrenceExpander, RecurrenceRule};
use crate::repository::Repository;
use crate::timezone::{normalize, start_of_month, start_of_next_month, start_of_year};

pub const DEFAULT_CATEGORY_NAME: &str = "General";
pub const DEFAULT_CATEGORY_COLOR: &str = "#6366f1";

/// Result of creating a task: the head and, for recurring tasks, the
/// generated occurrences in start order.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub head: Occurrence,
    pub children: Vec<Occurrence>,
}

impl CreatedTask {
    /// Head plus generated occurrences.
    pub fn occurrence_count(&self) -> usize {
        1 + self.children.len()
    }
}

/// The occurrences of one display day together with the window they were
/// fetched for.
#[derive(Debug, Clone)]
pub struct DayAgenda {
    pub window: DayWindow,
    pub occurrences: Vec<Occurrence>,
}

impl DayAgenda {
    pub fn slots(&self) -> Vec<LayoutSlot<'_>> {
        layout(&self.occurrences, &self.window)
    }
}

pub struct Planner<R: Repository> {
    repo: R,
    materialization: MaterializationConfig,
}

impl<R: Repository> Planner<R> {
    pub fn new(repo: R, config: MaterializationConfig) -> Self {
        Self {
            repo,
            materialization: config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a task and, when it carries a rule, its generated occurrences.
    /// Everything is written in one batch.
    pub async fn create_task(
        &self,
        owner_id: Uuid,
        data: NewOccurrenceData,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<CreatedTask, CoreError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("Task title cannot be empty".to_string()));
        }

        let start = resolve_time(&data.start, tz)?;
        let end = resolve_time(&data.end, tz)?;
        if start >= end {
            return Err(CoreError::InvalidInterval(format!(
                "planned start {} is not before planned end {}",
                start, end
            )));
        }
        debug!(%start, %end, %tz, "normalized planned interval");

        if let Some(rule) = &data.recurrence_rule {
            rule.validate()?;
        }

        let priority = data.priority.unwrap_or_default();
        let mut head = Occurrence::planned(owner_id, data.category_id, title, start, end);
        head.priority = priority;
        head.recurrence_rule = data.recurrence_rule.clone();

        let duration = end - start;
        let children: Vec<Occurrence> = match &data.recurrence_rule {
            Some(rule) => RecurrenceExpander::new(self.materialization.clone(), tz)
                .expand(start, rule, now)
                .into_iter()
                .filter_map(|child_start| {
                    let child_end = child_start.checked_add_signed(duration)?;
                    let mut child = Occurrence::planned(owner_id, data.category_id, title, child_start, child_end);
                    child.priority = priority;
                    child.parent_id = Some(head.id);
                    Some(child)
                })
                .collect(),
            None => Vec::new(),
        };

        let mut batch = Vec::with_capacity(children.len() + 1);
        batch.push(head.clone());
        batch.extend(children.iter().cloned());
        self.repo.insert_occurrences(batch).await?;

        if head.is_series_head() {
            info!(id = %head.id, children = children.len(), "created recurring task");
        } else {
            info!(id = %head.id, "created task");
        }

        Ok(CreatedTask { head, children })
    }

    async fn load(&self, id: Uuid) -> Result<Occurrence, CoreError> {
        self.repo
            .find_occurrence_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Task {}", id)))
    }

    /// Moves an occurrence to `target`. A rejected transition writes nothing.
    pub async fn change_status(&self, id: Uuid, target: TaskStatus, at: DateTime<Utc>) -> Result<Occurrence, CoreError> {
        let occurrence = self.load(id).await?;
        let change = transition(&occurrence, target, at)?;
        self.repo.update_occurrence_fields(id, change.into_update()).await
    }

    pub async fn reflect(&self, id: Uuid, reflection: Reflection) -> Result<Occurrence, CoreError> {
        let occurrence = self.load(id).await?;
        let reflection = set_reflection(&occurrence, reflection)?;
        let update = UpdateOccurrenceData {
            reflection: Some(reflection),
            ..Default::default()
        };
        self.repo.update_occurrence_fields(id, update).await
    }

    /// Edits a single occurrence. Siblings generated from the same rule are
    /// left alone.
    pub async fn edit(&self, id: Uuid, edit: OccurrenceEdit) -> Result<Occurrence, CoreError> {
        let occurrence = self.load(id).await?;

        let title = match edit.title {
            Some(title) if title.trim().is_empty() => {
                return Err(CoreError::InvalidInput("Task title cannot be empty".to_string()));
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };

        let start = edit.planned_start.unwrap_or(occurrence.planned_start);
        let end = edit.planned_end.unwrap_or(occurrence.planned_end);
        if start >= end {
            return Err(CoreError::InvalidInterval(format!(
                "planned start {} is not before planned end {}",
                start, end
            )));
        }

        let update = UpdateOccurrenceData {
            title,
            category_id: edit.category_id,
            planned_start: edit.planned_start,
            planned_end: edit.planned_end,
            ..Default::default()
        };
        if update.is_empty() {
            return Ok(occurrence);
        }
        self.repo.update_occurrence_fields(id, update).await
    }

    pub async fn day_layout(&self, owner_id: Uuid, date: NaiveDate, tz: Tz) -> Result<DayAgenda, CoreError> {
        let window = DayWindow::in_timezone(date, tz);
        let occurrences = self
            .repo
            .find_occurrences(owner_id, TimeRange::new(window.start, window.end))
            .await?;
        Ok(DayAgenda { window, occurrences })
    }

    /// One [`DayAgenda`] per local day from `first` through `last`, read from
    /// the store in a single range query. Blocks crossing midnight appear on
    /// every day they touch.
    pub async fn agenda(&self, owner_id: Uuid, first: NaiveDate, last: NaiveDate, tz: Tz) -> Result<Vec<DayAgenda>, CoreError> {
        if last < first {
            return Err(CoreError::InvalidInput(format!("agenda range ends ({}) before it starts ({})", last, first)));
        }
        let windows: Vec<DayWindow> = first
            .iter_days()
            .take_while(|date| *date <= last)
            .map(|date| DayWindow::in_timezone(date, tz))
            .collect();
        let (Some(opening), Some(closing)) = (windows.first(), windows.last()) else {
            return Ok(Vec::new());
        };
        let range = TimeRange::new(opening.start, closing.end);
        let occurrences = self.repo.find_occurrences(owner_id, range).await?;
        debug!(%first, %last, fetched = occurrences.len(), "loaded agenda range");

        Ok(windows
            .into_iter()
            .map(|window| {
                let day = TimeRange::new(window.start, window.end);
                let occurrences = occurrences
                    .iter()
                    .filter(|o| day.overlaps(o.planned_start, o.planned_end))
                    .cloned()
                    .collect();
                DayAgenda { window, occurrences }
            })
            .collect())
    }

    /// Insights for `mode`, computed against one captured `reference_now`.
    pub async fn insights(
        &self,
        owner_id: Uuid,
        mode: ReportMode,
        tz: Tz,
        config: InsightsConfig,
        reference_now: DateTime<Utc>,
    ) -> Result<InsightsReport, CoreError> {
        let month_start = start_of_month(reference_now, tz);
        let floor = match mode {
            ReportMode::Month => month_start,
            ReportMode::Year => start_of_year(reference_now, tz),
            ReportMode::AllTime => match self.repo.find_earliest_occurrence(owner_id).await? {
                Some(earliest) => start_of_month(earliest.planned_start, tz),
                None => month_start,
            },
        };
        // the consistency score always needs the current month
        let range = TimeRange::new(floor.min(month_start), start_of_next_month(reference_now, tz));

        let history = self.repo.find_occurrences(owner_id, range).await?;
        let categories = self.repo.find_categories(owner_id).await?;

        Ok(AnalyticsAggregator::new(config, tz).compute(&history, &categories, mode, reference_now))
    }

    /// Completed occurrences per month over the last year and whether each
    /// month has enough of them to export.
    pub async fn export_eligibility(
        &self,
        owner_id: Uuid,
        tz: Tz,
        reference_now: DateTime<Utc>,
    ) -> Result<Vec<MonthlyCount>, CoreError> {
        let range = TimeRange::new(
            start_of_month(reference_now - Duration::days(365), tz),
            start_of_next_month(reference_now, tz),
        );
        let history = self.repo.find_occurrences(owner_id, range).await?;
        Ok(monthly_completion_counts(&history, reference_now, tz))
    }

    /// Looks a category up by name, or falls back to the owner's default
    /// category, creating it on first use.
    pub async fn category_or_default(&self, owner_id: Uuid, name: Option<&str>) -> Result<Category, CoreError> {
        if let Some(name) = name {
            return self
                .repo
                .find_category_by_name(owner_id, name)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Category '{}'", name)));
        }

        let categories = self.repo.find_categories(owner_id).await?;
        if let Some(default) = categories.into_iter().find(|c| c.is_default) {
            return Ok(default);
        }
        self.repo
            .add_category(
                owner_id,
                DEFAULT_CATEGORY_NAME.to_string(),
                DEFAULT_CATEGORY_COLOR.to_string(),
                true,
            )
            .await
    }

    pub async fn save_template(&self, owner_id: Uuid, name: &str, rule: RecurrenceRule) -> Result<RecurrenceTemplate, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("Template name cannot be empty".to_string()));
        }
        rule.validate()?;
        self.repo.add_template(owner_id, name.to_string(), rule).await
    }

    pub async fn find_template(&self, owner_id: Uuid, name: &str) -> Result<RecurrenceTemplate, CoreError> {
        self.repo
            .find_template_by_name(owner_id, name)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Template '{}'", name)))
    }
}

fn resolve_time(time: &PlannedTime, tz: Tz) -> Result<DateTime<Utc>, CoreError> {
    match time {
        PlannedTime::Raw(raw) => normalize(raw, tz),
        PlannedTime::Instant(instant) => Ok(*instant),
    }
}
