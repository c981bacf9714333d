//! KMS record repository.

use async_trait::async_trait;

use lockbox_core::result::AppResult;
use lockbox_entity::kms::KmsRecord;

use super::{PgStore, db_error};
use crate::store::KmsStore;

#[async_trait]
impl KmsStore for PgStore {
    async fn find_kms(&self, id: &str) -> AppResult<Option<KmsRecord>> {
        sqlx::query_as::<_, KmsRecord>("SELECT * FROM kms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find KMS"))
    }

    async fn find_active_kms(&self) -> AppResult<Option<KmsRecord>> {
        sqlx::query_as::<_, KmsRecord>("SELECT * FROM kms WHERE active = TRUE LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find active KMS"))
    }

    async fn list_kms(&self) -> AppResult<Vec<KmsRecord>> {
        sqlx::query_as::<_, KmsRecord>("SELECT * FROM kms ORDER BY description ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list KMS records"))
    }

    async fn create_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        sqlx::query_as::<_, KmsRecord>(
            "INSERT INTO kms (id, kms_type, description, config, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, FALSE, $5, $6) RETURNING *",
        )
        .bind(&record.id)
        .bind(record.kms_type)
        .bind(&record.description)
        .bind(&record.config)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create KMS"))
    }

    async fn update_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        sqlx::query_as::<_, KmsRecord>(
            "UPDATE kms SET description = $2, config = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(&record.id)
        .bind(&record.description)
        .bind(&record.config)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to update KMS"))
    }

    async fn activate_kms(&self, id: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query("UPDATE kms SET active = FALSE, updated_at = NOW() WHERE active = TRUE")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to deactivate KMS records"))?;

        let result = sqlx::query("UPDATE kms SET active = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to activate KMS"))?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the deactivation.
            return Err(lockbox_core::AppError::not_found(format!(
                "KMS '{id}' not found"
            )));
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit KMS activation"))
    }

    async fn delete_kms(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM kms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete KMS"))?;
        Ok(())
    }
}
