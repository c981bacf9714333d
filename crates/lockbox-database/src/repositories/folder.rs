//! Folder repository.

use async_trait::async_trait;

use lockbox_core::result::AppResult;
use lockbox_entity::folder::Folder;

use super::{PgStore, db_error};
use crate::store::FolderStore;

#[async_trait]
impl FolderStore for PgStore {
    async fn find_folder(&self, id: &str) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find folder"))
    }

    async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders ORDER BY description ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list folders"))
    }

    async fn list_child_folders(&self, parent_id: &str) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent = $1 ORDER BY description ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list child folders"))
    }

    async fn create_folder(&self, folder: &Folder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (id, description, parent, personal, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&folder.id)
        .bind(&folder.description)
        .bind(&folder.parent)
        .bind(folder.personal)
        .bind(&folder.user_id)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create folder"))
    }

    async fn update_folder(&self, folder: &Folder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders SET description = $2, parent = $3, personal = $4, user_id = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(&folder.id)
        .bind(&folder.description)
        .bind(&folder.parent)
        .bind(folder.personal)
        .bind(&folder.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to update folder"))
    }

    async fn delete_folder(&self, id: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query("DELETE FROM folder_group_permissions WHERE folder_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folder permissions"))?;

        sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folder"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit folder delete"))
    }
}
