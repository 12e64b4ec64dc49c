use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{Category, Occurrence, RecurrenceTemplate, Reflection, TaskPriority, TaskStatus, TimeRange, UpdateOccurrenceData};
use crate::recurrence::RecurrenceRule;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub mod categories;
pub mod occurrences;
pub mod templates;

/// Column list shared by every occurrence query, in `OccurrenceRow` order.
pub(crate) const OCCURRENCE_COLUMNS: &str = "id, owner_id, category_id, title, planned_start, planned_end, \
     actual_start, actual_end, status, parent_id, recurrence_rule, priority, mood, reflection_value, created_at";

/// Flat database shape of an [`Occurrence`]. The rule is stored as JSON text
/// and the reflection as two nullable columns.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct OccurrenceRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub parent_id: Option<Uuid>,
    pub recurrence_rule: Option<String>,
    pub priority: TaskPriority,
    pub mood: Option<String>,
    pub reflection_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OccurrenceRow> for Occurrence {
    type Error = CoreError;

    fn try_from(row: OccurrenceRow) -> Result<Self, Self::Error> {
        let recurrence_rule = row
            .recurrence_rule
            .as_deref()
            .map(RecurrenceRule::from_blob)
            .transpose()?;
        let reflection = Reflection {
            mood: row.mood,
            value: row.reflection_value,
        };

        Ok(Occurrence {
            id: row.id,
            owner_id: row.owner_id,
            category_id: row.category_id,
            title: row.title,
            planned_start: row.planned_start,
            planned_end: row.planned_end,
            actual_start: row.actual_start,
            actual_end: row.actual_end,
            status: row.status,
            parent_id: row.parent_id,
            recurrence_rule,
            priority: row.priority,
            reflection: (!reflection.is_empty()).then_some(reflection),
            created_at: row.created_at,
        })
    }
}

pub(crate) fn into_occurrences(rows: Vec<OccurrenceRow>) -> Result<Vec<Occurrence>, CoreError> {
    rows.into_iter().map(Occurrence::try_from).collect()
}

/// Store contract for occurrences. Planned times are always absolute instants.
#[async_trait]
pub trait OccurrenceRepository {
    /// Inserts all occurrences in one transaction; either every row lands or none does.
    async fn insert_occurrences(&self, occurrences: Vec<Occurrence>) -> Result<Vec<Uuid>, CoreError>;
    /// Occurrences of `owner_id` overlapping `range`, ordered by planned start.
    async fn find_occurrences(&self, owner_id: Uuid, range: TimeRange) -> Result<Vec<Occurrence>, CoreError>;
    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError>;
    /// Occurrences of `owner_id` whose id starts with `short_id` (dashes ignored).
    async fn find_occurrences_by_short_id_prefix(&self, owner_id: Uuid, short_id: &str) -> Result<Vec<Occurrence>, CoreError>;
    /// Writes the `Some` fields of `data` and returns the updated row.
    async fn update_occurrence_fields(&self, id: Uuid, data: UpdateOccurrenceData) -> Result<Occurrence, CoreError>;
    async fn find_earliest_occurrence(&self, owner_id: Uuid) -> Result<Option<Occurrence>, CoreError>;
    /// Occurrences generated from the series headed by `parent_id`.
    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<Occurrence>, CoreError>;
}

#[async_trait]
pub trait CategoryRepository {
    async fn add_category(&self, owner_id: Uuid, name: String, color: String, is_default: bool) -> Result<Category, CoreError>;
    async fn find_categories(&self, owner_id: Uuid) -> Result<Vec<Category>, CoreError>;
    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<Category>, CoreError>;
    async fn find_category_by_name(&self, owner_id: Uuid, name: &str) -> Result<Option<Category>, CoreError>;
}

#[async_trait]
pub trait TemplateRepository {
    async fn add_template(&self, owner_id: Uuid, name: String, rule: RecurrenceRule) -> Result<RecurrenceTemplate, CoreError>;
    async fn find_templates(&self, owner_id: Uuid) -> Result<Vec<RecurrenceTemplate>, CoreError>;
    async fn find_template_by_name(&self, owner_id: Uuid, name: &str) -> Result<Option<RecurrenceTemplate>, CoreError>;
}

/// Everything the planner needs from a store.
#[async_trait]
pub trait Repository: OccurrenceRepository + CategoryRepository + TemplateRepository + Send + Sync {}

/// SQLite implementation of the store contracts
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
