//! User repository.

use async_trait::async_trait;
use tracing::debug;

use lockbox_core::result::AppResult;
use lockbox_entity::folder::Folder;
use lockbox_entity::user::User;

use super::{PgStore, db_error};
use crate::store::UserStore;

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user"))
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user by login"))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY login ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list users"))
    }

    async fn create_user_with_personal_folder(
        &self,
        user: &User,
        folder: &Folder,
        group_ids: &[&str],
    ) -> AppResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, login, email, secret, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&user.id)
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.secret)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to create user"))?;

        sqlx::query(
            "INSERT INTO folders (id, description, parent, personal, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&folder.id)
        .bind(&folder.description)
        .bind(&folder.parent)
        .bind(folder.personal)
        .bind(&folder.user_id)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to create personal folder"))?;

        for group_id in group_ids {
            sqlx::query("INSERT INTO group_memberships (group_id, user_id) VALUES ($1, $2)")
                .bind(*group_id)
                .bind(&user.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to add user to group"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit user creation"))?;
        Ok(created)
    }

    async fn delete_user(&self, id: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let statements = [
            ("DELETE FROM group_memberships WHERE user_id = $1", "memberships"),
            ("DELETE FROM api_keys WHERE user_id = $1", "API keys"),
            (
                "DELETE FROM items WHERE folder_id IN \
                 (SELECT id FROM folders WHERE personal AND user_id = $1)",
                "personal items",
            ),
            (
                "DELETE FROM folder_group_permissions WHERE folder_id IN \
                 (SELECT id FROM folders WHERE personal AND user_id = $1)",
                "personal folder permissions",
            ),
        ];
        for (sql, what) in statements {
            let result = sqlx::query(sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete user data"))?;
            debug!(user_id = %id, rows = result.rows_affected(), "Deleted {what}");
        }

        // Personal subfolders reference their parents; delete leaves first.
        loop {
            let removed = sqlx::query(
                "DELETE FROM folders f WHERE f.personal AND f.user_id = $1 \
                 AND NOT EXISTS (SELECT 1 FROM folders c WHERE c.parent = f.id)",
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete personal folders"))?
            .rows_affected();
            if removed == 0 {
                break;
            }
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete user"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit user deletion"))
    }
}
