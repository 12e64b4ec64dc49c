use crate::error::CoreError;
use crate::models::{Occurrence, TimeRange, UpdateOccurrenceData};
use crate::repository::{into_occurrences, OccurrenceRow, SqliteRepository, OCCURRENCE_COLUMNS};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    #[tracing::instrument(skip(self, occurrences), fields(count = occurrences.len()))]
    async fn insert_occurrences(&self, occurrences: Vec<Occurrence>) -> Result<Vec<Uuid>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(occurrences.len());

        for occurrence in &occurrences {
            Self::insert_occurrence_in_transaction(&mut tx, occurrence).await?;
            ids.push(occurrence.id);
        }

        tx.commit().await?;
        debug!(inserted = ids.len(), "inserted occurrences");
        Ok(ids)
    }

    #[tracing::instrument(skip(self))]
    async fn find_occurrences(&self, owner_id: Uuid, range: TimeRange) -> Result<Vec<Occurrence>, CoreError> {
        let sql = format!(
            "SELECT {} FROM occurrences
            WHERE owner_id = $1 AND planned_start < $2 AND planned_end > $3
            ORDER BY planned_start, planned_end, id",
            OCCURRENCE_COLUMNS
        );
        let rows: Vec<OccurrenceRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(range.end)
            .bind(range.start)
            .fetch_all(self.pool())
            .await?;
        into_occurrences(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let sql = format!("SELECT {} FROM occurrences WHERE id = $1", OCCURRENCE_COLUMNS);
        let row: Option<OccurrenceRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Occurrence::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_occurrences_by_short_id_prefix(&self, owner_id: Uuid, short_id: &str) -> Result<Vec<Occurrence>, CoreError> {
        // ids are stored as 16-byte blobs, so match against their hex form
        let mut pattern: String = short_id
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        pattern.push('%');

        let sql = format!(
            "SELECT {} FROM occurrences WHERE owner_id = $1 AND lower(hex(id)) LIKE $2 ORDER BY planned_start",
            OCCURRENCE_COLUMNS
        );
        let rows: Vec<OccurrenceRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        into_occurrences(rows)
    }

    #[tracing::instrument(skip(self, data))]
    async fn update_occurrence_fields(&self, id: Uuid, data: UpdateOccurrenceData) -> Result<Occurrence, CoreError> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM occurrences WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::NotFound(id.to_string()));
        }

        if !data.is_empty() {
            Self::update_occurrence_fields_in_transaction(&mut tx, id, &data).await?;
        }

        let sql = format!("SELECT {} FROM occurrences WHERE id = $1", OCCURRENCE_COLUMNS);
        let row: OccurrenceRow = sqlx::query_as(&sql).bind(id).fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Occurrence::try_from(row)
    }

    #[tracing::instrument(skip(self))]
    async fn find_earliest_occurrence(&self, owner_id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let sql = format!(
            "SELECT {} FROM occurrences WHERE owner_id = $1 ORDER BY planned_start LIMIT 1",
            OCCURRENCE_COLUMNS
        );
        let row: Option<OccurrenceRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Occurrence::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<Occurrence>, CoreError> {
        let sql = format!(
            "SELECT {} FROM occurrences WHERE parent_id = $1 ORDER BY planned_start",
            OCCURRENCE_COLUMNS
        );
        let rows: Vec<OccurrenceRow> = sqlx::query_as(&sql)
            .bind(parent_id)
            .fetch_all(self.pool())
            .await?;
        into_occurrences(rows)
    }
}

impl SqliteRepository {
    async fn insert_occurrence_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        occurrence: &Occurrence,
    ) -> Result<(), CoreError> {
        let rule = occurrence
            .recurrence_rule
            .as_ref()
            .map(|rule| rule.to_blob())
            .transpose()?;
        let (mood, value) = match &occurrence.reflection {
            Some(reflection) => (reflection.mood.clone(), reflection.value.clone()),
            None => (None, None),
        };

        sqlx::query(
            r#"INSERT INTO occurrences (
                id, owner_id, category_id, title, planned_start, planned_end,
                actual_start, actual_end, status, parent_id, recurrence_rule, priority,
                mood, reflection_value, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(occurrence.id)
        .bind(occurrence.owner_id)
        .bind(occurrence.category_id)
        .bind(&occurrence.title)
        .bind(occurrence.planned_start)
        .bind(occurrence.planned_end)
        .bind(occurrence.actual_start)
        .bind(occurrence.actual_end)
        .bind(occurrence.status)
        .bind(occurrence.parent_id)
        .bind(rule)
        .bind(occurrence.priority)
        .bind(mood)
        .bind(value)
        .bind(occurrence.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn update_occurrence_fields_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        data: &UpdateOccurrenceData,
    ) -> Result<(), CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE occurrences SET ");
        let mut fields = qb.separated(", ");

        if let Some(title) = &data.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(category_id) = data.category_id {
            fields.push("category_id = ").push_bind_unseparated(category_id);
        }
        if let Some(planned_start) = data.planned_start {
            fields.push("planned_start = ").push_bind_unseparated(planned_start);
        }
        if let Some(planned_end) = data.planned_end {
            fields.push("planned_end = ").push_bind_unseparated(planned_end);
        }
        if let Some(status) = data.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(actual_start) = data.actual_start {
            fields.push("actual_start = ").push_bind_unseparated(actual_start);
        }
        if let Some(actual_end) = data.actual_end {
            fields.push("actual_end = ").push_bind_unseparated(actual_end);
        }
        if let Some(reflection) = &data.reflection {
            fields.push("mood = ").push_bind_unseparated(reflection.mood.clone());
            fields.push("reflection_value = ").push_bind_unseparated(reflection.value.clone());
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut **tx).await?;

        Ok(())
    }
}
