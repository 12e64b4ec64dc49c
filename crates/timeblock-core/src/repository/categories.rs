use crate::error::CoreError;
use crate::models::Category;
use crate::repository::{CategoryRepository, SqliteRepository};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl CategoryRepository for SqliteRepository {
    #[tracing::instrument(skip(self))]
    async fn add_category(
        &self,
        owner_id: Uuid,
        name: String,
        color: String,
        is_default: bool,
    ) -> Result<Category, CoreError> {
        if self.find_category_by_name(owner_id, &name).await?.is_some() {
            return Err(CoreError::InvalidInput(format!("Category '{}' already exists", name)));
        }

        let category = sqlx::query_as(
            r#"INSERT INTO categories (id, owner_id, name, color, is_default)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, color, is_default
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(name)
        .bind(color)
        .bind(is_default)
        .fetch_one(self.pool())
        .await?;

        Ok(category)
    }

    async fn find_categories(&self, owner_id: Uuid) -> Result<Vec<Category>, CoreError> {
        let categories = sqlx::query_as(
            "SELECT id, owner_id, name, color, is_default FROM categories WHERE owner_id = $1 ORDER BY is_default DESC, name",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;
        Ok(categories)
    }

    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<Category>, CoreError> {
        let category = sqlx::query_as("SELECT id, owner_id, name, color, is_default FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(category)
    }

    async fn find_category_by_name(&self, owner_id: Uuid, name: &str) -> Result<Option<Category>, CoreError> {
        let category = sqlx::query_as(
            "SELECT id, owner_id, name, color, is_default FROM categories WHERE owner_id = $1 AND name = $2 COLLATE NOCASE",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(category)
    }
}
