//! Group membership repository.

use async_trait::async_trait;

use lockbox_core::result::AppResult;

use super::{PgStore, db_error};
use crate::store::MembershipStore;

#[async_trait]
impl MembershipStore for PgStore {
    async fn list_user_groups(&self, user_id: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT group_id FROM group_memberships WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list user groups"))
    }

    async fn list_group_members(&self, group_id: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM group_memberships WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list group members"))
    }

    async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM group_memberships WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check membership"))
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO group_memberships (group_id, user_id) VALUES ($1, $2)")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Membership already exists or could not be added"))?;
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM group_memberships WHERE group_id = $1 AND user_id = $2")
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to remove membership"))?;
        Ok(result.rows_affected() > 0)
    }
}
