use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Planned,
    Active,
    Completed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Planned => write!(f, "planned"),
            TaskStatus::Active => write!(f, "active"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(TaskStatus::Planned),
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "skipped" => Ok(TaskStatus::Skipped),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

/// How a completed block felt and what it was worth, recorded after the fact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reflection {
    pub mood: Option<String>,
    pub value: Option<String>,
}

impl Reflection {
    pub fn is_empty(&self) -> bool {
        self.mood.is_none() && self.value.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Hex display color, e.g. "#6366f1"
    pub color: String,
    pub is_default: bool,
}

/// A single scheduled time block, standalone or generated from a recurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Occurrence {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    /// Head of the series this occurrence was generated from.
    /// Generated rows are independent after creation: edits never cascade.
    pub parent_id: Option<Uuid>,
    /// Only the series head carries the rule.
    pub recurrence_rule: Option<RecurrenceRule>,
    pub priority: TaskPriority,
    pub reflection: Option<Reflection>,
    pub created_at: DateTime<Utc>,
}

impl Occurrence {
    /// A fresh `Planned` occurrence. Callers are expected to have validated
    /// `planned_start < planned_end`.
    pub fn planned(
        owner_id: Uuid,
        category_id: Uuid,
        title: impl Into<String>,
        planned_start: DateTime<Utc>,
        planned_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner_id,
            category_id,
            title: title.into(),
            planned_start,
            planned_end,
            actual_start: None,
            actual_end: None,
            status: TaskStatus::Planned,
            parent_id: None,
            recurrence_rule: None,
            priority: TaskPriority::default(),
            reflection: None,
            created_at: Utc::now(),
        }
    }

    pub fn planned_duration(&self) -> Duration {
        self.planned_end - self.planned_start
    }

    pub fn actual_duration(&self) -> Option<Duration> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// How late (positive) or early (negative) execution started versus the plan.
    pub fn start_drift(&self) -> Option<Duration> {
        self.actual_start.map(|start| start - self.planned_start)
    }

    /// Planned or running past its planned end.
    pub fn is_missed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, TaskStatus::Planned | TaskStatus::Active) && self.planned_end <= now
    }

    pub fn is_series_head(&self) -> bool {
        self.recurrence_rule.is_some()
    }
}

/// Half-open range `[start, end)` on the absolute timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when `[a_start, a_end)` shares any instant with this range.
    pub fn overlaps(&self, a_start: DateTime<Utc>, a_end: DateTime<Utc>) -> bool {
        a_start < self.end && a_end > self.start
    }
}

/// Planned time as supplied by a caller: either still raw text or already on
/// the absolute timeline.
#[derive(Debug, Clone)]
pub enum PlannedTime {
    Raw(String),
    Instant(DateTime<Utc>),
}

impl From<DateTime<Utc>> for PlannedTime {
    fn from(instant: DateTime<Utc>) -> Self {
        PlannedTime::Instant(instant)
    }
}

impl From<&str> for PlannedTime {
    fn from(raw: &str) -> Self {
        PlannedTime::Raw(raw.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NewOccurrenceData {
    pub title: String,
    pub category_id: Uuid,
    pub start: PlannedTime,
    pub end: PlannedTime,
    pub priority: Option<TaskPriority>,
    /// When present, the created occurrence becomes a series head and the
    /// rule is expanded into child occurrences.
    pub recurrence_rule: Option<RecurrenceRule>,
}

/// Partial field set written by `update_occurrence_fields`.
/// `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOccurrenceData {
    pub title: Option<String>,
    pub category_id: Option<Uuid>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub reflection: Option<Reflection>,
}

impl UpdateOccurrenceData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User-level edit of one occurrence. Never applied to siblings.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceEdit {
    pub title: Option<String>,
    pub category_id: Option<Uuid>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
}

/// A named, reusable recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurrenceTemplate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub rule: RecurrenceRule,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn sample() -> Occurrence {
        Occurrence::planned(Uuid::nil(), Uuid::nil(), "Deep work", at(9, 0), at(10, 30))
    }

    #[rstest]
    #[case("planned", TaskStatus::Planned)]
    #[case("Active", TaskStatus::Active)]
    #[case("COMPLETED", TaskStatus::Completed)]
    #[case("skipped", TaskStatus::Skipped)]
    fn test_status_from_str(#[case] input: &str, #[case] expected: TaskStatus) {
        assert_eq!(input.parse::<TaskStatus>().unwrap(), expected);
    }

    #[test]
    fn test_status_from_str_invalid() {
        assert_eq!(
            "done".parse::<TaskStatus>(),
            Err(ParseTaskStatusError("done".to_string()))
        );
    }

    #[test]
    fn test_priority_default_is_medium() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_new_occurrence_is_planned() {
        let occurrence = sample();
        assert_eq!(occurrence.status, TaskStatus::Planned);
        assert_eq!(occurrence.planned_duration(), Duration::minutes(90));
        assert!(occurrence.actual_duration().is_none());
        assert!(!occurrence.is_series_head());
    }

    #[test]
    fn test_drift_and_actual_duration() {
        let mut occurrence = sample();
        occurrence.actual_start = Some(at(9, 15));
        occurrence.actual_end = Some(at(10, 0));
        assert_eq!(occurrence.start_drift(), Some(Duration::minutes(15)));
        assert_eq!(occurrence.actual_duration(), Some(Duration::minutes(45)));
    }

    #[rstest]
    #[case(TaskStatus::Planned, true)]
    #[case(TaskStatus::Active, true)]
    #[case(TaskStatus::Completed, false)]
    #[case(TaskStatus::Skipped, false)]
    fn test_is_missed(#[case] status: TaskStatus, #[case] missed: bool) {
        let mut occurrence = sample();
        occurrence.status = status;
        assert_eq!(occurrence.is_missed(at(11, 0)), missed);
        assert!(!occurrence.is_missed(at(10, 0) - Duration::seconds(1)));
    }

    #[test]
    fn test_time_range_overlap_is_half_open() {
        let range = TimeRange::new(at(9, 0), at(10, 0));
        assert!(range.overlaps(at(9, 30), at(11, 0)));
        assert!(!range.overlaps(at(10, 0), at(11, 0)));
        assert!(!range.overlaps(at(8, 0), at(9, 0)));
    }
}
