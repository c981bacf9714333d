//! API key repository.

use async_trait::async_trait;
use sqlx::types::Json;

use lockbox_core::result::AppResult;
use lockbox_entity::apikey::ApiKey;

use super::{PgStore, db_error};
use crate::store::ApiKeyStore;

#[async_trait]
impl ApiKeyStore for PgStore {
    async fn find_api_key(&self, id: &str) -> AppResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find API key"))
    }

    async fn list_api_keys(&self, user_id: Option<&str>) -> AppResult<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE ($1::VARCHAR IS NULL OR user_id = $1) \
             ORDER BY description ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list API keys"))
    }

    async fn count_api_keys_by_kms(&self, kms_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM api_keys WHERE kms_id = $1")
            .bind(kms_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count API keys by KMS"))
    }

    async fn create_api_key(&self, key: &ApiKey) -> AppResult<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (id, description, user_id, secret_hash, secret, kms_id, expires_at, \
             active, ip_whitelist, time_whitelist, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(&key.id)
        .bind(&key.description)
        .bind(&key.user_id)
        .bind(&key.secret_hash)
        .bind(Json(&key.secret))
        .bind(&key.kms_id)
        .bind(key.expires_at)
        .bind(key.active)
        .bind(&key.ip_whitelist)
        .bind(&key.time_whitelist)
        .bind(key.created_at)
        .bind(key.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create API key"))
    }

    async fn touch_api_key(&self, id: &str) -> AppResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to record API key use"))?;
        Ok(())
    }

    async fn delete_api_key(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete API key"))?;
        Ok(result.rows_affected() > 0)
    }
}
