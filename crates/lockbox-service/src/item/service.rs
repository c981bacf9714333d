//! Item CRUD with envelope encryption.
//!
//! Titles are stored in clear so folders can be listed without touching
//! the KMS; descriptions and payloads are encrypted with the active KMS at
//! write time and decrypted with whichever KMS produced them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_core::types::new_id;
use lockbox_database::ItemStore;
use lockbox_entity::item::Item;
use lockbox_entity::kms::Envelope;
use lockbox_kms::KmsWallet;

use crate::context::RequestContext;
use crate::folder::FolderHierarchy;

/// Manages encrypted items.
#[derive(Clone)]
pub struct ItemService {
    hierarchy: Arc<FolderHierarchy>,
    items: Arc<dyn ItemStore>,
    wallet: Arc<KmsWallet>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for ItemService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemService").finish()
    }
}

/// Request to create an item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItemRequest {
    /// Owning folder.
    pub folder_id: String,
    /// Clear-text title.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Description, encrypted at rest.
    #[serde(default)]
    pub description: String,
    /// Secret payload, encrypted at rest.
    pub data: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: String,
}

/// Request to update an item. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateItemRequest {
    /// New title.
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New payload.
    pub data: Option<String>,
    /// New metadata.
    pub metadata: Option<String>,
}

/// Decrypted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    /// Item ID.
    pub id: String,
    /// Owning folder.
    pub folder_id: String,
    /// Title.
    pub title: String,
    /// Decrypted description.
    pub description: String,
    /// Decrypted payload.
    pub data: String,
    /// Metadata.
    pub metadata: String,
    /// KMS that encrypted the item.
    pub kms_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Listing entry; nothing is decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Item ID.
    pub id: String,
    /// Owning folder.
    pub folder_id: String,
    /// Title.
    pub title: String,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            folder_id: item.folder_id.clone(),
            title: item.title.clone(),
            updated_at: item.updated_at,
        }
    }
}

impl ItemService {
    /// Creates a new item service.
    pub fn new(
        hierarchy: Arc<FolderHierarchy>,
        items: Arc<dyn ItemStore>,
        wallet: Arc<KmsWallet>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            hierarchy,
            items,
            wallet,
            audit,
        }
    }

    /// Lists the items of a folder the caller can read.
    pub async fn list_items(
        &self,
        ctx: &RequestContext,
        folder_id: &str,
    ) -> AppResult<Vec<ItemSummary>> {
        self.hierarchy.require_read(ctx, folder_id, None).await?;
        let items = self.items.list_items(folder_id).await?;
        Ok(items.iter().map(ItemSummary::from).collect())
    }

    /// Gets and decrypts an item.
    pub async fn get_item(&self, ctx: &RequestContext, id: &str) -> AppResult<ItemView> {
        let item = self.find(id).await?;
        self.hierarchy.require_read(ctx, &item.folder_id, None).await?;

        let view = self.decrypt(item).await?;
        self.audit
            .log(&ctx.user_id, AuditAction::Read, AuditEntity::Item, id);
        Ok(view)
    }

    /// Creates an item, encrypting it with the active KMS.
    pub async fn create_item(
        &self,
        ctx: &RequestContext,
        req: CreateItemRequest,
    ) -> AppResult<ItemView> {
        req.validate()?;
        self.hierarchy
            .require_write(ctx, &req.folder_id, None)
            .await?;

        let (description, data) = self.seal(&req.description, &req.data).await?;
        let now = Utc::now();
        let item = Item {
            id: new_id(),
            folder_id: req.folder_id,
            title: req.title,
            kms_id: data.kms_id.clone(),
            description,
            data,
            metadata: req.metadata,
            created_at: now,
            updated_at: now,
        };

        let item = self.items.create_item(&item).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::Item, &item.id);
        info!(
            user_id = %ctx.user_id,
            item_id = %item.id,
            folder_id = %item.folder_id,
            kms_id = ?item.kms_id,
            "Item created"
        );

        Ok(ItemView {
            id: item.id,
            folder_id: item.folder_id,
            title: item.title,
            description: req.description,
            data: req.data,
            metadata: item.metadata,
            kms_id: item.kms_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }

    /// Updates an item. Both encrypted fields are re-encrypted with the
    /// currently active KMS.
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        id: &str,
        req: UpdateItemRequest,
    ) -> AppResult<ItemView> {
        req.validate()?;
        let item = self.find(id).await?;
        self.hierarchy
            .require_write(ctx, &item.folder_id, None)
            .await?;

        let mut view = self.decrypt(item.clone()).await?;
        if let Some(title) = req.title {
            view.title = title;
        }
        if let Some(description) = req.description {
            view.description = description;
        }
        if let Some(data) = req.data {
            view.data = data;
        }
        if let Some(metadata) = req.metadata {
            view.metadata = metadata;
        }

        let (description, data) = self.seal(&view.description, &view.data).await?;
        let updated = Item {
            title: view.title.clone(),
            kms_id: data.kms_id.clone(),
            description,
            data,
            metadata: view.metadata.clone(),
            updated_at: Utc::now(),
            ..item
        };
        let updated = self.items.update_item(&updated).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Update, AuditEntity::Item, id);
        info!(user_id = %ctx.user_id, item_id = %id, kms_id = ?updated.kms_id, "Item updated");

        view.kms_id = updated.kms_id;
        view.updated_at = updated.updated_at;
        Ok(view)
    }

    /// Moves an item; needs write on both folders.
    pub async fn move_item(
        &self,
        ctx: &RequestContext,
        id: &str,
        dest_folder_id: &str,
    ) -> AppResult<ItemSummary> {
        let mut item = self.find(id).await?;
        self.hierarchy
            .require_write(ctx, &item.folder_id, None)
            .await?;
        self.hierarchy
            .require_write(ctx, dest_folder_id, None)
            .await?;

        let source = std::mem::replace(&mut item.folder_id, dest_folder_id.to_string());
        item.updated_at = Utc::now();
        let item = self.items.update_item(&item).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Move, AuditEntity::Item, id);
        info!(
            user_id = %ctx.user_id,
            item_id = %id,
            from = %source,
            to = %dest_folder_id,
            "Item moved"
        );

        Ok(ItemSummary::from(&item))
    }

    /// Deletes an item.
    pub async fn delete_item(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        let item = self.find(id).await?;
        self.hierarchy
            .require_write(ctx, &item.folder_id, None)
            .await?;

        self.items.delete_item(id).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::Item, id);
        info!(user_id = %ctx.user_id, item_id = %id, "Item deleted");

        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Item> {
        self.items
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Item '{id}' not found")))
    }

    /// Encrypts both secret fields under one provider so the item's
    /// `kms_id` covers everything it stores.
    async fn seal(&self, description: &str, data: &str) -> AppResult<(Envelope, Envelope)> {
        let provider = self.wallet.active_provider().await?;
        let description = self.wallet.seal(&provider, description.as_bytes()).await?;
        let data = self.wallet.seal(&provider, data.as_bytes()).await?;
        Ok((description, data))
    }

    async fn decrypt(&self, item: Item) -> AppResult<ItemView> {
        let description = self.wallet.decrypt_string(&item.description).await?;
        let data = self.wallet.decrypt_string(&item.data).await?;
        Ok(ItemView {
            id: item.id,
            folder_id: item.folder_id,
            title: item.title,
            description,
            data,
            metadata: item.metadata,
            kms_id: item.kms_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }
}
