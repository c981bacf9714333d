//! Item repository.

use async_trait::async_trait;
use sqlx::types::Json;

use lockbox_core::result::AppResult;
use lockbox_entity::item::Item;

use super::{PgStore, db_error};
use crate::store::ItemStore;

#[async_trait]
impl ItemStore for PgStore {
    async fn find_item(&self, id: &str) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find item"))
    }

    async fn list_items(&self, folder_id: &str) -> AppResult<Vec<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE folder_id = $1 ORDER BY title ASC")
            .bind(folder_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list items"))
    }

    async fn count_items(&self, folder_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE folder_id = $1")
            .bind(folder_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count items"))
    }

    async fn count_items_by_kms(&self, kms_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE kms_id = $1")
            .bind(kms_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count items by KMS"))
    }

    async fn create_item(&self, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (id, folder_id, title, description, data, kms_id, metadata, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(&item.id)
        .bind(&item.folder_id)
        .bind(&item.title)
        .bind(Json(&item.description))
        .bind(Json(&item.data))
        .bind(&item.kms_id)
        .bind(&item.metadata)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create item"))
    }

    async fn update_item(&self, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "UPDATE items SET folder_id = $2, title = $3, description = $4, data = $5, \
             kms_id = $6, metadata = $7, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(&item.id)
        .bind(&item.folder_id)
        .bind(&item.title)
        .bind(Json(&item.description))
        .bind(Json(&item.data))
        .bind(&item.kms_id)
        .bind(&item.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to update item"))
    }

    async fn delete_item(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete item"))?;
        Ok(result.rows_affected() > 0)
    }
}
