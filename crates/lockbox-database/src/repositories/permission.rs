//! Folder-group permission repository.

use async_trait::async_trait;

use lockbox_core::result::AppResult;
use lockbox_entity::permission::FolderGroupPermission;

use super::{PgStore, db_error};
use crate::store::PermissionStore;

#[async_trait]
impl PermissionStore for PgStore {
    async fn list_folder_permissions(
        &self,
        folder_id: &str,
    ) -> AppResult<Vec<FolderGroupPermission>> {
        sqlx::query_as::<_, FolderGroupPermission>(
            "SELECT * FROM folder_group_permissions WHERE folder_id = $1 ORDER BY group_id",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list folder permissions"))
    }

    async fn permissions_for_groups(
        &self,
        folder_id: &str,
        group_ids: &[String],
    ) -> AppResult<Vec<FolderGroupPermission>> {
        sqlx::query_as::<_, FolderGroupPermission>(
            "SELECT * FROM folder_group_permissions WHERE folder_id = $1 AND group_id = ANY($2)",
        )
        .bind(folder_id)
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load folder permissions"))
    }

    async fn upsert_permission(&self, permission: &FolderGroupPermission) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO folder_group_permissions (folder_id, group_id, read, write) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (folder_id, group_id) DO UPDATE SET read = $3, write = $4",
        )
        .bind(&permission.folder_id)
        .bind(&permission.group_id)
        .bind(permission.read)
        .bind(permission.write)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to save folder permission"))?;
        Ok(())
    }

    async fn delete_permission(&self, folder_id: &str, group_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM folder_group_permissions WHERE folder_id = $1 AND group_id = $2",
        )
        .bind(folder_id)
        .bind(group_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to delete folder permission"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn readable_folder_ids(&self, group_ids: &[String]) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT f.id FROM folders f \
             INNER JOIN folder_group_permissions p ON p.folder_id = f.id \
             WHERE p.read = TRUE AND p.group_id = ANY($1) \
             ORDER BY f.id",
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load readable folders"))
    }
}
