//! Group repository.

use async_trait::async_trait;

use lockbox_core::result::AppResult;
use lockbox_entity::group::Group;

use super::{PgStore, db_error};
use crate::store::GroupStore;

#[async_trait]
impl GroupStore for PgStore {
    async fn find_group(&self, id: &str) -> AppResult<Option<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find group"))
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups ORDER BY description ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list groups"))
    }

    async fn list_child_groups(&self, parent_id: &str) -> AppResult<Vec<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE parent = $1 ORDER BY description ASC")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list child groups"))
    }

    async fn create_group(&self, group: &Group) -> AppResult<Group> {
        sqlx::query_as::<_, Group>(
            "INSERT INTO groups (id, description, parent, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&group.id)
        .bind(&group.description)
        .bind(&group.parent)
        .bind(group.created_at)
        .bind(group.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create group"))
    }

    async fn update_group(&self, group: &Group) -> AppResult<Group> {
        sqlx::query_as::<_, Group>(
            "UPDATE groups SET description = $2, parent = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(&group.id)
        .bind(&group.description)
        .bind(&group.parent)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to update group"))
    }

    async fn delete_group(&self, id: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query("DELETE FROM folder_group_permissions WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete group permissions"))?;

        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete group"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit group delete"))
    }
}
