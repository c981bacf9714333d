//! Admin operations on KMS records.
//!
//! Every successful mutation resets the wallet so the next encryption
//! resolves the active KMS and its provider afresh.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_core::types::new_id;
use lockbox_database::{ApiKeyStore, ItemStore, KmsStore};
use lockbox_entity::kms::{KmsRecord, KmsType};
use lockbox_kms::KmsWallet;

use crate::context::RequestContext;

/// Manages KMS records.
#[derive(Clone)]
pub struct KmsService {
    store: Arc<dyn KmsStore>,
    items: Arc<dyn ItemStore>,
    api_keys: Arc<dyn ApiKeyStore>,
    wallet: Arc<KmsWallet>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for KmsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsService").finish()
    }
}

/// Request to register a KMS.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateKmsRequest {
    /// Provider kind.
    pub kms_type: KmsType,
    /// Display name, also the metrics label.
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Provider configuration as JSON.
    #[serde(default = "empty_config")]
    pub config: String,
}

/// Request to update a KMS.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateKmsRequest {
    /// New display name.
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    /// New provider configuration.
    pub config: Option<String>,
}

fn empty_config() -> String {
    "{}".to_string()
}

impl KmsService {
    /// Creates a new KMS service.
    pub fn new(
        store: Arc<dyn KmsStore>,
        items: Arc<dyn ItemStore>,
        api_keys: Arc<dyn ApiKeyStore>,
        wallet: Arc<KmsWallet>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            items,
            api_keys,
            wallet,
            audit,
        }
    }

    /// Lists all KMS records.
    pub async fn list_kms(&self, ctx: &RequestContext) -> AppResult<Vec<KmsRecord>> {
        ctx.require_admin()?;
        self.store.list_kms().await
    }

    /// Gets a KMS record.
    pub async fn get_kms(&self, ctx: &RequestContext, id: &str) -> AppResult<KmsRecord> {
        ctx.require_admin()?;
        self.find(id).await
    }

    /// Registers a KMS after checking that its provider can be built and
    /// round-trips a value. New records start inactive.
    pub async fn create_kms(
        &self,
        ctx: &RequestContext,
        req: CreateKmsRequest,
    ) -> AppResult<KmsRecord> {
        ctx.require_admin()?;
        req.validate()?;
        lockbox_kms::config::validate(req.kms_type, &req.config)?;

        let now = Utc::now();
        let record = KmsRecord {
            id: new_id(),
            kms_type: req.kms_type,
            description: req.description,
            config: req.config,
            active: false,
            created_at: now,
            updated_at: now,
        };
        self.probe(&record).await?;

        let record = self.store.create_kms(&record).await?;

        self.wallet.reset_wallet().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::Kms, &record.id);
        info!(
            user_id = %ctx.user_id,
            kms_id = %record.id,
            kms_type = %record.kms_type,
            "KMS created"
        );

        Ok(record)
    }

    /// Updates a KMS. The configuration of a KMS that still protects data
    /// cannot change.
    pub async fn update_kms(
        &self,
        ctx: &RequestContext,
        id: &str,
        req: UpdateKmsRequest,
    ) -> AppResult<KmsRecord> {
        ctx.require_admin()?;
        req.validate()?;

        let mut record = self.find(id).await?;
        if let Some(config) = req.config
            && config != record.config
        {
            let references = self.references(id).await?;
            if references > 0 {
                return Err(AppError::unprocessable(format!(
                    "KMS '{id}' protects {references} value(s); its configuration cannot change"
                )));
            }
            lockbox_kms::config::validate(record.kms_type, &config)?;
            record.config = config;
            self.probe(&record).await?;
        }
        if let Some(description) = req.description {
            record.description = description;
        }
        record.updated_at = Utc::now();

        let record = self.store.update_kms(&record).await?;

        self.wallet.reset_wallet().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Update, AuditEntity::Kms, id);
        info!(user_id = %ctx.user_id, kms_id = %id, "KMS updated");

        Ok(record)
    }

    /// Makes a KMS the active one, deactivating every other.
    pub async fn activate_kms(&self, ctx: &RequestContext, id: &str) -> AppResult<KmsRecord> {
        ctx.require_admin()?;
        self.find(id).await?;

        self.store.activate_kms(id).await?;

        self.wallet.reset_wallet().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Update, AuditEntity::Kms, id);
        info!(user_id = %ctx.user_id, kms_id = %id, "KMS activated");

        self.find(id).await
    }

    /// Deletes a KMS that is neither active nor referenced by any item or
    /// API key.
    pub async fn delete_kms(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        ctx.require_admin()?;

        let record = self.find(id).await?;
        if record.active {
            return Err(AppError::unprocessable(format!(
                "KMS '{id}' is active and cannot be deleted"
            )));
        }
        let references = self.references(id).await?;
        if references > 0 {
            return Err(AppError::unprocessable(format!(
                "KMS '{id}' is still referenced by {references} value(s)"
            )));
        }

        self.store.delete_kms(id).await?;

        self.wallet.reset_wallet().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::Kms, id);
        info!(user_id = %ctx.user_id, kms_id = %id, "KMS deleted");

        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<KmsRecord> {
        self.store
            .find_kms(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("KMS '{id}' not found")))
    }

    async fn references(&self, id: &str) -> AppResult<i64> {
        let items = self.items.count_items_by_kms(id).await?;
        let keys = self.api_keys.count_api_keys_by_kms(id).await?;
        Ok(items + keys)
    }

    async fn probe(&self, record: &KmsRecord) -> AppResult<()> {
        self.wallet.probe(record).await.map_err(|e| {
            AppError::unprocessable(format!("KMS configuration check failed: {}", e.message))
        })
    }
}
