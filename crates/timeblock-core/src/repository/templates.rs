use crate::error::CoreError;
use crate::models::RecurrenceTemplate;
use crate::recurrence::RecurrenceRule;
use crate::repository::{SqliteRepository, TemplateRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    rule: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for RecurrenceTemplate {
    type Error = CoreError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(RecurrenceTemplate {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            rule: RecurrenceRule::from_blob(&row.rule)?,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl TemplateRepository for SqliteRepository {
    #[tracing::instrument(skip(self))]
    async fn add_template(
        &self,
        owner_id: Uuid,
        name: String,
        rule: RecurrenceRule,
    ) -> Result<RecurrenceTemplate, CoreError> {
        if self.find_template_by_name(owner_id, &name).await?.is_some() {
            return Err(CoreError::InvalidInput(format!("Template '{}' already exists", name)));
        }

        let template = RecurrenceTemplate {
            id: Uuid::now_v7(),
            owner_id,
            name,
            rule,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO recurrence_templates (id, owner_id, name, rule, created_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(template.id)
        .bind(template.owner_id)
        .bind(&template.name)
        .bind(template.rule.to_blob()?)
        .bind(template.created_at)
        .execute(self.pool())
        .await?;

        Ok(template)
    }

    async fn find_templates(&self, owner_id: Uuid) -> Result<Vec<RecurrenceTemplate>, CoreError> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "SELECT id, owner_id, name, rule, created_at FROM recurrence_templates WHERE owner_id = $1 ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(RecurrenceTemplate::try_from).collect()
    }

    async fn find_template_by_name(&self, owner_id: Uuid, name: &str) -> Result<Option<RecurrenceTemplate>, CoreError> {
        let row: Option<TemplateRow> = sqlx::query_as(
            "SELECT id, owner_id, name, rule, created_at FROM recurrence_templates WHERE owner_id = $1 AND name = $2 COLLATE NOCASE",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        row.map(RecurrenceTemplate::try_from).transpose()
    }
}
